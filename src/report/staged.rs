use std::path::{Path, PathBuf};

/// Write every `(path, contents)` pair or none of them. Each file is first
/// written to `<path>.tmp`, then all temp files are renamed into place. If
/// any step fails, temp files and files already renamed by this call are
/// removed before the error is returned.
pub fn write_all_or_nothing(outputs: &[(&str, &[u8])]) -> eyre::Result<()> {
    let mut staged: Vec<(PathBuf, &str)> = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        match stage(path, contents) {
            Ok(temp) => staged.push((temp, *path)),
            Err(e) => {
                discard(staged.iter().map(|(temp, _)| temp.as_path()));
                return Err(e);
            }
        }
    }

    for (i, (temp, path)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(temp, path) {
            discard(staged[..i].iter().map(|(_, placed)| Path::new(*placed)));
            discard(staged[i..].iter().map(|(temp, _)| temp.as_path()));
            return Err(eyre::eyre!("Failed to move output into place '{}': {}", path, e));
        }
    }
    Ok(())
}

fn stage(path: &str, contents: &[u8]) -> eyre::Result<PathBuf> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| eyre::eyre!("Failed to create output directory '{}': {}", parent.display(), e))?;
    }
    let temp = PathBuf::from(format!("{}.tmp", path));
    std::fs::write(&temp, contents)
        .map_err(|e| eyre::eyre!("Failed to write output '{}': {}", temp.display(), e))?;
    Ok(temp)
}

fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to clean up output");
        }
    }
}
