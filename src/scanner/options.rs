use crate::scanner::{Result, ScanError, block::DEFAULT_BUFFER_SIZE};

/// Smallest accepted buffer size
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Rows per output batch
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Scan configuration, validated once at bind time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub buffer_size: usize,
    pub threads: usize,
    pub batch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            threads: rayon::current_num_threads(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ScanError::Config(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE} bytes, got {}",
                self.buffer_size
            )));
        }
        if self.threads == 0 {
            return Err(ScanError::Config("threads must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ScanError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Applies named parameters of the table function on top of the defaults.
    ///
    /// Keys are case-insensitive. Only `buffer_size` is recognized.
    pub fn from_named_parameters<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = ScanOptions::default();
        for (key, value) in params {
            match key.to_ascii_lowercase().as_str() {
                "buffer_size" => {
                    options.buffer_size = value.trim().parse().map_err(|_| {
                        ScanError::Config(format!(
                            "buffer_size must be an unsigned integer, got {value:?}"
                        ))
                    })?;
                }
                other => {
                    return Err(ScanError::Config(format!(
                        "unknown parameter for scan_csv: {other}"
                    )));
                }
            }
        }
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = ScanOptions::default();
        assert_eq!(options.buffer_size, 32_000_000);
        assert_eq!(options.batch_size, 2048);
        assert!(options.threads >= 1);
        options.validate().unwrap();
    }

    #[test]
    fn test_buffer_size_floor() {
        assert!(ScanOptions::new().with_buffer_size(1024).validate().is_ok());
        assert!(matches!(
            ScanOptions::new().with_buffer_size(1023).validate(),
            Err(ScanError::Config(_))
        ));
    }

    #[test]
    fn test_zero_threads_or_batch_size_rejected() {
        assert!(ScanOptions::new().with_threads(0).validate().is_err());
        assert!(ScanOptions::new().with_batch_size(0).validate().is_err());
    }

    #[test]
    fn test_named_parameters() {
        let options = ScanOptions::from_named_parameters([("BUFFER_SIZE", "4096")]).unwrap();
        assert_eq!(options.buffer_size, 4096);

        assert!(matches!(
            ScanOptions::from_named_parameters([("buffer_size", "12")]),
            Err(ScanError::Config(_))
        ));
        assert!(matches!(
            ScanOptions::from_named_parameters([("buffer_size", "-1")]),
            Err(ScanError::Config(_))
        ));
        assert!(matches!(
            ScanOptions::from_named_parameters([("delimiter", ";")]),
            Err(ScanError::Config(_))
        ));
    }
}
