//! Error types for the flow-field core.

use thiserror::Error;

/// Errors produced by flow-field operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Width or height was zero when configuring the simulation area.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// A configuration value was rejected; the previous valid state is kept.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A grid sample addressed a cell whose right or bottom neighbor does not exist.
    #[error("sample at cell ({x}, {y}) out of bounds for grid of {cols} cols x {rows} rows")]
    OutOfBoundsSample {
        x: isize,
        y: isize,
        cols: usize,
        rows: usize,
    },

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A palette could not be constructed or looked up.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// The configured noise backend name is not recognized.
    #[error("unknown noise backend: {0}")]
    UnknownNoiseBackend(String),

    /// A file could not be read or written.
    #[error("io error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let msg = FlowError::InvalidDimensions.to_string();
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn invalid_configuration_includes_reason() {
        let msg = FlowError::InvalidConfiguration("cell_size must be positive".into()).to_string();
        assert!(msg.contains("cell_size"), "missing reason in: {msg}");
    }

    #[test]
    fn out_of_bounds_sample_includes_cell_and_extent() {
        let err = FlowError::OutOfBoundsSample {
            x: 12,
            y: -3,
            cols: 7,
            rows: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"), "missing x in: {msg}");
        assert!(msg.contains("-3"), "missing y in: {msg}");
        assert!(msg.contains("7 cols"), "missing cols in: {msg}");
        assert!(msg.contains("9 rows"), "missing rows in: {msg}");
    }

    #[test]
    fn unknown_noise_backend_includes_name() {
        let msg = FlowError::UnknownNoiseBackend("simplex".into()).to_string();
        assert!(msg.contains("simplex"), "missing name in: {msg}");
    }

    #[test]
    fn flow_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlowError>();
    }

    #[test]
    fn flow_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<FlowError>();
    }
}
