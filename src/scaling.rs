//! Rational output downscaling.
//!
//! A [`ScalingRule`] maps the physical window size to the resolution every
//! pass renders at. Downscaled output is stretched back to the window on
//! present, which is how low-power GPUs keep up with full-screen shaders.

use crate::error::ScalingError;
use crate::layout::Size;

/// A rational downscale factor `numerator / denominator` with
/// `0 <= numerator <= denominator` and a non-zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalingRule {
    numerator: u32,
    denominator: u32,
}

impl ScalingRule {
    /// Full resolution.
    pub const IDENTITY: Self = Self {
        numerator: 1,
        denominator: 1,
    };

    /// Half resolution in both dimensions.
    pub const HALF: Self = Self {
        numerator: 1,
        denominator: 2,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ScalingError> {
        if denominator == 0 {
            return Err(ScalingError::ZeroDenominator);
        }
        if numerator > denominator {
            return Err(ScalingError::Upscale {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Scales both dimensions, truncating toward zero.
    ///
    /// The product is taken in 64 bits so large screens cannot overflow.
    pub fn apply(&self, size: Size) -> Size {
        let scale = |v: u32| {
            (u64::from(v) * u64::from(self.numerator) / u64::from(self.denominator)) as u32
        };
        Size::new(scale(size.width), scale(size.height))
    }

    pub fn is_identity(&self) -> bool {
        self.numerator == self.denominator
    }
}

impl Default for ScalingRule {
    fn default() -> Self {
        Self::HALF
    }
}

impl std::fmt::Display for ScalingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl std::str::FromStr for ScalingRule {
    type Err = ScalingError;

    /// Parses `"n/d"` or a bare `"n"` (meaning `n/n`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| ScalingError::Parse(s.to_string()))
        };
        match s.split_once('/') {
            Some((n, d)) => Self::new(parse(n)?, parse(d)?),
            None => {
                let n = parse(s)?;
                Self::new(n, n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_of_full_hd() {
        let rule = ScalingRule::new(1, 2).unwrap();
        assert_eq!(rule.apply(Size::new(1920, 1080)), Size::new(960, 540));
        assert!(!rule.is_identity());
    }

    #[test]
    fn identity_keeps_size() {
        let rule = ScalingRule::new(1, 1).unwrap();
        assert_eq!(rule.apply(Size::new(1920, 1080)), Size::new(1920, 1080));
        assert!(rule.is_identity());
        assert!(ScalingRule::new(3, 3).unwrap().is_identity());
    }

    #[test]
    fn third_truncates() {
        let rule = ScalingRule::new(1, 3).unwrap();
        assert_eq!(rule.apply(Size::new(1920, 1080)), Size::new(640, 360));
        assert_eq!(rule.apply(Size::new(1000, 500)), Size::new(333, 166));
    }

    #[test]
    fn zero_numerator_collapses() {
        let rule = ScalingRule::new(0, 4).unwrap();
        assert!(rule.apply(Size::new(1920, 1080)).is_empty());
    }

    #[test]
    fn rejects_invalid_ratios() {
        assert!(matches!(
            ScalingRule::new(1, 0),
            Err(ScalingError::ZeroDenominator)
        ));
        assert!(matches!(
            ScalingRule::new(3, 2),
            Err(ScalingError::Upscale {
                numerator: 3,
                denominator: 2
            })
        ));
    }

    #[test]
    fn parses_ratio_strings() {
        assert_eq!("1/2".parse::<ScalingRule>().unwrap(), ScalingRule::HALF);
        assert_eq!(" 2 / 3".parse::<ScalingRule>().unwrap(), ScalingRule::new(2, 3).unwrap());
        assert_eq!("4".parse::<ScalingRule>().unwrap(), ScalingRule::new(4, 4).unwrap());
        assert!("half".parse::<ScalingRule>().is_err());
        assert!("2/1".parse::<ScalingRule>().is_err());
    }
}
