use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LiveMapError {
    /// The aggregation worker rejected its job or failed while running it
    Compute(String),
    /// The target surface cannot receive a frame
    Presentation {
        /// Requested surface width in pixels
        width: u32,
        /// Requested surface height in pixels
        height: u32,
    },
    /// No genome mapping is available for the chromosome of the current locus
    UnsupportedLocus(String),
}

impl LiveMapError {
    pub fn compute(msg: impl Into<String>) -> Self {
        LiveMapError::Compute(msg.into())
    }
}

impl fmt::Display for LiveMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveMapError::Compute(msg) => write!(f, "Compute error: {}", msg),
            LiveMapError::Presentation { width, height } => write!(
                f,
                "Presentation error: invalid surface dimensions {}x{}",
                width, height
            ),
            LiveMapError::UnsupportedLocus(chr) => {
                write!(f, "Live maps are not available for chromosome {}", chr)
            }
        }
    }
}

impl std::error::Error for LiveMapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = LiveMapError::Presentation {
            width: 0,
            height: 12,
        };
        assert_eq!(
            err.to_string(),
            "Presentation error: invalid surface dimensions 0x12"
        );
        assert_eq!(
            LiveMapError::UnsupportedLocus("chrUn".to_string()).to_string(),
            "Live maps are not available for chromosome chrUn"
        );
    }
}
