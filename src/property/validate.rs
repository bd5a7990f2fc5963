use super::PropertyId;

pub const MIN_BUFFER_LENGTH: usize = 512;
pub const MAX_BUFFER_LENGTH: usize = 65536;
pub const MIN_CHANNELS: usize = 1;
pub const MAX_CHANNELS: usize = 2;

/// Clamp `v` into `[lower, upper]`. Returns true if it had to move.
#[inline]
pub fn within_range(v: &mut usize, lower: usize, upper: usize) -> bool {
    if (lower..=upper).contains(v) {
        return false;
    }
    *v = (*v).clamp(lower, upper);
    true
}

/// Force `v` to exactly `size`. Returns true unless it already was.
#[inline]
pub fn to_fix_size(v: &mut usize, size: usize) -> bool {
    let changed = *v != size;
    *v = size;
    changed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Range { min: usize, max: usize },
    Fixed(usize),
}

/// Sanitizes the integer properties of a ring buffer before they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub length: LengthRule,
    pub min_channels: usize,
    pub max_channels: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            length: LengthRule::Range {
                min: MIN_BUFFER_LENGTH,
                max: MAX_BUFFER_LENGTH,
            },
            min_channels: MIN_CHANNELS,
            max_channels: MAX_CHANNELS,
        }
    }
}

impl Validator {
    pub fn fixed_length(size: usize) -> Self {
        Self {
            length: LengthRule::Fixed(size),
            ..Self::default()
        }
    }

    /// Sanitize `v` for `id` in place and report whether it changed.
    /// Properties without an integer rule pass through untouched.
    pub fn validate(&self, id: PropertyId, v: &mut usize) -> bool {
        match (id, self.length) {
            (PropertyId::BufferLength, LengthRule::Range { min, max }) => within_range(v, min, max),
            (PropertyId::BufferLength, LengthRule::Fixed(size)) => to_fix_size(v, size),
            (PropertyId::NumChannels, _) => within_range(v, self.min_channels, self.max_channels),
            (PropertyId::Active, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clamps_length_to_bounds() {
        let validator = Validator::default();

        let mut short = 100;
        assert!(validator.validate(PropertyId::BufferLength, &mut short));
        assert_eq!(short, 512);

        let mut long = 70_000;
        assert!(validator.validate(PropertyId::BufferLength, &mut long));
        assert_eq!(long, 65_536);

        let mut fine = 4096;
        assert!(!validator.validate(PropertyId::BufferLength, &mut fine));
        assert_eq!(fine, 4096);
    }

    #[test]
    fn default_clamps_channels() {
        let validator = Validator::default();

        let mut none = 0;
        assert!(validator.validate(PropertyId::NumChannels, &mut none));
        assert_eq!(none, 1);

        let mut surround = 6;
        assert!(validator.validate(PropertyId::NumChannels, &mut surround));
        assert_eq!(surround, 2);
    }

    #[test]
    fn fixed_size_reports_change_unless_exact() {
        let validator = Validator::fixed_length(8192);

        let mut requested = 8192;
        assert!(!validator.validate(PropertyId::BufferLength, &mut requested));

        let mut requested = 8000;
        assert!(validator.validate(PropertyId::BufferLength, &mut requested));
        assert_eq!(requested, 8192);
    }
}
