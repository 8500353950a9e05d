use std::path::Path;
use unic_langid::LanguageIdentifier;

/// Validate file path exists and is readable
pub fn validate_file_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(format!("File does not exist: {}", path));
    }

    if !path_obj.is_file() {
        return Err(format!("Path is not a file: {}", path));
    }

    Ok(())
}

/// Validate output directory exists or can be created
pub fn validate_output_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if path_obj.is_dir() {
        return Err(format!("Output path is a directory: {}", path));
    }

    if let Some(parent) = path_obj.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        return Err(format!("Cannot create output directory: {}", e));
    }

    Ok(())
}

/// Validate language code format using unic-langid (same as the CSV reader)
pub fn validate_language_code(lang: &str) -> Result<(), String> {
    if lang.is_empty() {
        return Err("Language code cannot be empty".to_string());
    }

    lang.parse::<LanguageIdentifier>().map(|_| ()).map_err(|_| {
        format!(
            "Invalid language code format: {}. Expected valid BCP 47 language identifier",
            lang
        )
    })
}

/// Parse a one-character CSV separator such as `;` or `\t`.
pub fn parse_separator(separator: &str) -> Result<u8, String> {
    match separator {
        "\\t" | "tab" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!(
            "Invalid separator: {:?}. Expected a single ASCII character",
            separator
        )),
    }
}
