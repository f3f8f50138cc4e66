//! WindowPlatform: responsibility and boundaries
//!
//! This module and its submodules are thin OS plumbing ONLY: process and window
//! discovery, display enumeration, style and geometry reads/writes. They MUST NOT
//! decide whether a window needs correcting; that belongs to `placement`.

pub mod simulated;
mod r#trait;
#[cfg(target_os = "windows")]
pub mod win32;

pub use self::r#trait::WindowPlatform;
pub use simulated::SimulatedPlatform;

/// Сравнивает имя исполняемого файла с искомым именем процесса.
///
/// Регистр не учитывается, суффикс ".exe" с обеих сторон необязателен.
pub fn process_name_matches(executable: &str, wanted: &str) -> bool {
    fn stem(name: &str) -> String {
        let lower = name.trim().to_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    }

    let wanted = stem(wanted);
    !wanted.is_empty() && stem(executable) == wanted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_names_ignore_case_and_extension() {
        assert!(process_name_matches("umamusume.exe", "umamusume"));
        assert!(process_name_matches("UmaMusume.EXE", "umamusume.exe"));
        assert!(process_name_matches("umamusume", "UMAMUSUME"));
        assert!(!process_name_matches("umamusume_launcher.exe", "umamusume"));
        assert!(!process_name_matches("anything.exe", ""));
    }
}
