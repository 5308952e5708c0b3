use std::collections::BTreeMap;
use std::str::FromStr;

use intcode::constants::{self as C, Word};
use intcode::runtime::to_address;
use intcode::Machine;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, i64 as parse_word, space0};
use nom::combinator::{all_consuming, map, opt, value};
use nom::error::{convert_error, VerboseError};
use nom::sequence::{pair, preceded};
use nom::{Finish, IResult};
use thiserror::Error;

/// One of the machine registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// The instruction pointer
    Ip,

    /// The relative base
    Rb,
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Register::Ip => write!(f, "%ip"),
            Register::Rb => write!(f, "%rb"),
        }
    }
}

impl Register {
    pub fn get(self, machine: &Machine) -> Word {
        match self {
            Register::Ip => Word::try_from(machine.registers.ip).unwrap_or(Word::MAX),
            Register::Rb => machine.registers.relative_base,
        }
    }
}

/// An address given to a debugger command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Direct(Word),
    Label(String),
    Indexed(Register, Word),
}

impl Address {
    pub fn evaluate(
        &self,
        machine: &Machine,
        labels: &BTreeMap<String, C::Address>,
    ) -> Result<C::Address, anyhow::Error> {
        let address = match self {
            Address::Direct(word) => *word,
            Address::Label(label) => {
                return labels
                    .get(label)
                    .copied()
                    .ok_or_else(|| anyhow::anyhow!("unknown label {label}"));
            }
            Address::Indexed(register, offset) => register.get(machine).wrapping_add(*offset),
        };

        Ok(to_address(address)?)
    }
}

#[derive(Debug, Error)]
#[error("could not parse address: {0}")]
pub struct ParseAddressError(String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s).map_err(|e| ParseAddressError(convert_error(s, e)))
    }
}

#[derive(Debug, Error)]
#[error("could not parse register: {0}")]
pub struct ParseRegisterError(String);

impl FromStr for Register {
    type Err = ParseRegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(parse_register)(s)
            .finish()
            .map(|(_, register)| register)
            .map_err(|e| ParseRegisterError(convert_error(s, e)))
    }
}

fn parse_register(input: &str) -> IResult<&str, Register, VerboseError<&str>> {
    alt((
        value(Register::Ip, tag("%ip")),
        value(Register::Rb, tag("%rb")),
    ))(input)
}

fn parse_indexed(input: &str) -> IResult<&str, Address, VerboseError<&str>> {
    let (rest, register) = parse_register(input)?;
    let (rest, offset) = opt(preceded(
        space0,
        pair(alt((char('+'), char('-'))), preceded(space0, parse_word)),
    ))(rest)?;

    let offset = match offset {
        Some(('-', offset)) => offset.wrapping_neg(),
        Some((_, offset)) => offset,
        None => 0,
    };

    Ok((rest, Address::Indexed(register, offset)))
}

fn parse_label(input: &str) -> IResult<&str, Address, VerboseError<&str>> {
    map(
        preceded(
            char('*'),
            take_while1(|c: char| c == '_' || c.is_ascii_alphanumeric()),
        ),
        |label: &str| Address::Label(label.to_owned()),
    )(input)
}

fn parse_address_inner(input: &str) -> IResult<&str, Address, VerboseError<&str>> {
    alt((map(parse_word, Address::Direct), parse_label, parse_indexed))(input)
}

fn parse_address(input: &str) -> Result<Address, VerboseError<&str>> {
    let (_, ret) = all_consuming(parse_address_inner)(input).finish()?;
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_address_test() {
        assert_eq!("42".parse::<Address>().unwrap(), Address::Direct(42));
        assert_eq!(
            "*loop".parse::<Address>().unwrap(),
            Address::Label(String::from("loop"))
        );
        assert_eq!(
            "%rb".parse::<Address>().unwrap(),
            Address::Indexed(Register::Rb, 0)
        );
        assert_eq!(
            "%ip + 3".parse::<Address>().unwrap(),
            Address::Indexed(Register::Ip, 3)
        );
        assert_eq!(
            "%rb-2".parse::<Address>().unwrap(),
            Address::Indexed(Register::Rb, -2)
        );
        assert!("%sp".parse::<Address>().is_err());
        assert!("loop".parse::<Address>().is_err());
    }

    #[test]
    fn evaluate_test() {
        let mut machine = Machine::new(&[99]);
        machine.registers.relative_base = 10;
        let labels = BTreeMap::from([(String::from("loop"), 4)]);

        let address = Address::Indexed(Register::Rb, -3);
        assert_eq!(address.evaluate(&machine, &labels).unwrap(), 7);
        let address = Address::Label(String::from("loop"));
        assert_eq!(address.evaluate(&machine, &labels).unwrap(), 4);
        assert!(Address::Direct(-1).evaluate(&machine, &labels).is_err());
        assert!(Address::Label(String::from("nope"))
            .evaluate(&machine, &labels)
            .is_err());
    }
}
