use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

#[cfg(target_os = "android")]
fn android_files_dir() -> Option<PathBuf> {
    use jni::{
        objects::{JObject, JString},
        JavaVM,
    };
    unsafe {
        let ctx = ndk_context::android_context();
        let vm = JavaVM::from_raw(ctx.vm().cast()).ok()?;
        let mut env = vm.attach_current_thread().ok()?;
        let activity = JObject::from_raw(ctx.context().cast());
        let files_dir = env
            .call_method(activity, "getFilesDir", "()Ljava/io/File;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path_obj = env
            .call_method(files_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path: String = env.get_string(&JString::from(abs_path_obj)).ok()?.into();
        Some(PathBuf::from(abs_path))
    }
}

/// Where captures and working copies go when nothing is configured
pub fn default_working_dir() -> PathBuf {
    #[cfg(target_os = "android")]
    {
        if let Some(dir) = android_files_dir() {
            return dir.join("media");
        }
        log::warn!("Could not resolve app files dir, falling back to ./data");
    }

    PathBuf::from("./data")
}

/// Makes `name` safe to use as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "media".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `base` plus the user-supplied sub-directory, never escaping `base`.
pub fn resolve_directory(base: &Path, directory: Option<&str>) -> PathBuf {
    let mut dir = base.to_path_buf();
    if let Some(directory) = directory {
        for part in directory.split(['/', '\\']) {
            let part = part.trim();
            if part.is_empty() || part == "." || part == ".." {
                continue;
            }
            dir.push(sanitize_component(part));
        }
    }
    dir
}

/// Sanitized `name` with `extension` appended when it has none.
pub fn file_name_with_extension(name: &str, extension: &str) -> String {
    let name = sanitize_component(name);
    if Path::new(&name).extension().is_some() {
        name
    } else {
        format!("{}.{}", name, extension)
    }
}

/// Sanitized `name` with its extension replaced by `extension`.
pub fn file_name_forcing_extension(name: &str, extension: &str) -> String {
    let name = sanitize_component(name);
    let stem = Path::new(&name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(name);
    format!("{}.{}", stem, extension)
}

/// `IMG_20240309_081500.jpg` style names.
pub fn timestamped_name(prefix: &str, at: DateTime<Local>, extension: &str) -> String {
    format!("{}_{}.{}", prefix, at.format("%Y%m%d_%H%M%S"), extension)
}

/// First of `name`, `stem_1.ext`, `stem_2.ext`, ... that doesn't exist in
/// `dir` yet.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut index = 1u32;
    loop {
        let file_name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, index, ext),
            None => format!("{}_{}", stem, index),
        };
        let candidate = dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}
