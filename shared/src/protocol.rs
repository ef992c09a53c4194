//! Line-oriented text protocol between clients and the server.
//!
//! One command per newline-terminated ASCII line, fields separated by single
//! spaces, floats formatted as decimal text. Clients send [`Command`] lines;
//! the server answers with [`Event`] lines. There is no handshake, no
//! versioning and no error acknowledgment: a malformed inbound line is logged
//! and dropped without ending the session.

use crate::{Ball, Vec2};
use std::fmt;

/// A request from a client to mutate the world or the simulation driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `A <mass> <radius> <x> <y> <vx> <vy>`: add a ball.
    Add {
        mass: f32,
        radius: f32,
        position: Vec2,
        velocity: Vec2,
    },
    /// `D <id>`: remove a ball; an unknown id is a no-op.
    Remove { id: u32 },
    /// `S`: scatter every ball to a random in-bounds position.
    Scatter,
    /// `T`: toggle pause/resume of the tick driver.
    TogglePause,
    /// `Z`: zero every ball's velocity.
    ZeroVelocities,
    /// `G`: toggle gravity between 0 and the default magnitude.
    ToggleGravity,
    /// `C`: toggle collision detection.
    ToggleCollisions,
    /// `E`: toggle restitution between 0 and the default.
    ToggleRestitution,
}

/// A state change announced by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `A <id> <mass> <radius> <x> <y> <vx> <vy>`: ball added, also used
    /// for the full snapshot a fresh session receives.
    Added {
        id: u32,
        mass: f32,
        radius: f32,
        position: Vec2,
        velocity: Vec2,
    },
    /// `U <id> <x> <y> <vx> <vy>`: ball position/velocity changed.
    Updated {
        id: u32,
        position: Vec2,
        velocity: Vec2,
    },
    /// `D <id>`: ball removed.
    Removed { id: u32 },
}

/// Why an inbound line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line.
    Empty,
    /// Verb is not part of the protocol.
    UnknownCommand(String),
    /// Right verb, wrong number of fields.
    WrongArgCount { expected: usize, got: usize },
    /// A field failed numeric parsing.
    InvalidNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty line"),
            ParseError::UnknownCommand(verb) => write!(f, "unknown command '{}'", verb),
            ParseError::WrongArgCount { expected, got } => {
                write!(f, "expected {} arguments, got {}", expected, got)
            }
            ParseError::InvalidNumber(field) => write!(f, "invalid number '{}'", field),
        }
    }
}

impl std::error::Error for ParseError {}

fn expect_args(args: &[&str], expected: usize) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongArgCount {
            expected,
            got: args.len(),
        })
    }
}

fn parse_f32(field: &str) -> Result<f32, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

fn parse_u32(field: &str) -> Result<u32, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

impl Command {
    /// Decodes one inbound line (without its trailing newline).
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (verb, args) = fields.split_first().ok_or(ParseError::Empty)?;

        match *verb {
            "A" => {
                expect_args(args, 6)?;
                Ok(Command::Add {
                    mass: parse_f32(args[0])?,
                    radius: parse_f32(args[1])?,
                    position: Vec2::new(parse_f32(args[2])?, parse_f32(args[3])?),
                    velocity: Vec2::new(parse_f32(args[4])?, parse_f32(args[5])?),
                })
            }
            "D" => {
                expect_args(args, 1)?;
                Ok(Command::Remove {
                    id: parse_u32(args[0])?,
                })
            }
            "S" => expect_args(args, 0).map(|_| Command::Scatter),
            "T" => expect_args(args, 0).map(|_| Command::TogglePause),
            "Z" => expect_args(args, 0).map(|_| Command::ZeroVelocities),
            "G" => expect_args(args, 0).map(|_| Command::ToggleGravity),
            "C" => expect_args(args, 0).map(|_| Command::ToggleCollisions),
            "E" => expect_args(args, 0).map(|_| Command::ToggleRestitution),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

impl Event {
    /// Builds the `A` announcement for a ball.
    pub fn added(ball: &Ball) -> Event {
        Event::Added {
            id: ball.id,
            mass: ball.mass,
            radius: ball.radius,
            position: ball.position,
            velocity: ball.velocity,
        }
    }

    /// Builds the `U` announcement for a ball.
    pub fn updated(ball: &Ball) -> Event {
        Event::Updated {
            id: ball.id,
            position: ball.position,
            velocity: ball.velocity,
        }
    }

    /// Encodes the event as one protocol line, without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Event::Added {
                id,
                mass,
                radius,
                position,
                velocity,
            } => format!(
                "A {} {} {} {} {} {} {}",
                id, mass, radius, position.x, position.y, velocity.x, velocity.y
            ),
            Event::Updated {
                id,
                position,
                velocity,
            } => format!(
                "U {} {} {} {} {}",
                id, position.x, position.y, velocity.x, velocity.y
            ),
            Event::Removed { id } => format!("D {}", id),
        }
    }

    /// Decodes one server line. Used by headless clients and tests.
    pub fn parse(line: &str) -> Result<Event, ParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (verb, args) = fields.split_first().ok_or(ParseError::Empty)?;

        match *verb {
            "A" => {
                expect_args(args, 7)?;
                Ok(Event::Added {
                    id: parse_u32(args[0])?,
                    mass: parse_f32(args[1])?,
                    radius: parse_f32(args[2])?,
                    position: Vec2::new(parse_f32(args[3])?, parse_f32(args[4])?),
                    velocity: Vec2::new(parse_f32(args[5])?, parse_f32(args[6])?),
                })
            }
            "U" => {
                expect_args(args, 5)?;
                Ok(Event::Updated {
                    id: parse_u32(args[0])?,
                    position: Vec2::new(parse_f32(args[1])?, parse_f32(args[2])?),
                    velocity: Vec2::new(parse_f32(args[3])?, parse_f32(args[4])?),
                })
            }
            "D" => {
                expect_args(args, 1)?;
                Ok(Event::Removed {
                    id: parse_u32(args[0])?,
                })
            }
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}
