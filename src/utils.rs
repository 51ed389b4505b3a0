//! Utility functions shared by the model and training layers

/// Mathematical utilities
pub mod math {
    /// Glorot/Xavier normal initialization standard deviation
    pub fn glorot_std(fan_in: usize, fan_out: usize) -> f32 {
        (2.0 / (fan_in + fan_out) as f32).sqrt()
    }

    /// Index of the largest score, first one wins on ties.
    ///
    /// Returns `None` for an empty slice.
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &s) in scores.iter().enumerate() {
            match best {
                Some((_, b)) if s <= b => {}
                _ if s.is_nan() => {}
                _ => best = Some((i, s)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// File I/O utilities
pub mod io {
    use std::fs;
    use std::path::Path;

    /// Create the parent directory of `path` if it is missing
    pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                fs::create_dir_all(parent)
            }
            _ => Ok(()),
        }
    }

    /// Replace `path` with `content` through a sibling temp file and a rename,
    /// so readers never observe a half-written file.
    pub fn write_file_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> std::io::Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)
    }
}
