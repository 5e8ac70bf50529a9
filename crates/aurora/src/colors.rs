//! Named colors accepted on the command line

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Red,
    /// Pure green. Earlier versions of this tool sent (255, 0, 0) for green.
    Green,
    Blue,
    White,
    Off,
    Cyan,
    Magenta,
    Yellow,
}

impl NamedColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
            Self::White => (255, 255, 255),
            Self::Off => (0, 0, 0),
            Self::Cyan => (0, 255, 255),
            Self::Magenta => (255, 0, 255),
            Self::Yellow => (255, 255, 0),
        }
    }
}

impl FromStr for NamedColor {
    type Err = String;

    /// Only the first letter matters, so "r", "red" and "rose" are all red.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('r') => Ok(Self::Red),
            Some('g') => Ok(Self::Green),
            Some('b') => Ok(Self::Blue),
            Some('w') => Ok(Self::White),
            Some('o') => Ok(Self::Off),
            Some('c') => Ok(Self::Cyan),
            Some('m') => Ok(Self::Magenta),
            Some('y') => Ok(Self::Yellow),
            _ => Err(format!(
                "unrecognized color {s:?} (red, green, blue, white, off, cyan, magenta, yellow)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_first_letter() {
        assert_eq!("red".parse::<NamedColor>().unwrap(), NamedColor::Red);
        assert_eq!("G".parse::<NamedColor>().unwrap(), NamedColor::Green);
        assert_eq!("off".parse::<NamedColor>().unwrap(), NamedColor::Off);
        assert!("purple".parse::<NamedColor>().is_err());
        assert!("".parse::<NamedColor>().is_err());
    }

    #[test]
    fn test_rgb() {
        assert_eq!(NamedColor::Magenta.rgb(), (255, 0, 255));
    }

    #[test]
    fn test_green_is_not_red() {
        assert_eq!(NamedColor::Green.rgb(), (0, 255, 0));
        assert_ne!(NamedColor::Green.rgb(), NamedColor::Red.rgb());
    }
}
