//! Language-specific backend implementations.

mod go;
mod javascript;
mod python;
mod rust_lang;
mod typescript;

pub use go::GoBackend;
pub use javascript::JavaScriptBackend;
pub use python::PythonBackend;
pub use rust_lang::RustBackend;
pub use typescript::TypeScriptBackend;

use super::LanguageBackend;
use once_cell::sync::OnceCell;

static GO_BACKEND: OnceCell<GoBackend> = OnceCell::new();
static JAVASCRIPT_BACKEND: OnceCell<JavaScriptBackend> = OnceCell::new();
static PYTHON_BACKEND: OnceCell<PythonBackend> = OnceCell::new();
static RUST_BACKEND: OnceCell<RustBackend> = OnceCell::new();
static TYPESCRIPT_BACKEND: OnceCell<TypeScriptBackend> = OnceCell::new();

/// Register all available language backends.
///
/// Idempotent; resolved once, never replaced at runtime.
pub fn register_backends() {
    GO_BACKEND.get_or_init(GoBackend::new);
    JAVASCRIPT_BACKEND.get_or_init(JavaScriptBackend::new);
    PYTHON_BACKEND.get_or_init(PythonBackend::new);
    RUST_BACKEND.get_or_init(RustBackend::new);
    TYPESCRIPT_BACKEND.get_or_init(TypeScriptBackend::new);
}

/// Get a backend by language tag.
///
/// Returns None for unknown tags; the extractor turns that into an
/// "unsupported language" diagnostic rather than an error.
pub fn get_backend(tag: &str) -> Option<&'static dyn LanguageBackend> {
    register_backends();

    match tag {
        "go" => GO_BACKEND.get().map(|b| b as &'static dyn LanguageBackend),
        "javascript" | "js" => JAVASCRIPT_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        "python" | "py" => PYTHON_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        "rust" | "rs" => RUST_BACKEND.get().map(|b| b as &'static dyn LanguageBackend),
        "typescript" | "ts" => TYPESCRIPT_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        _ => None,
    }
}

/// Get a backend for a file extension (without dot).
pub fn backend_for_extension(ext: &str) -> Option<&'static dyn LanguageBackend> {
    register_backends();

    match ext {
        "go" => GO_BACKEND.get().map(|b| b as &'static dyn LanguageBackend),
        "js" | "jsx" | "mjs" | "cjs" => JAVASCRIPT_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        "py" => PYTHON_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        "rs" => RUST_BACKEND.get().map(|b| b as &'static dyn LanguageBackend),
        "ts" | "tsx" | "mts" => TYPESCRIPT_BACKEND
            .get()
            .map(|b| b as &'static dyn LanguageBackend),
        _ => None,
    }
}

/// Language tag for a file extension, if one is registered.
pub fn tag_for_extension(ext: &str) -> Option<&'static str> {
    backend_for_extension(ext).map(|b| b.language_id())
}

/// All registered language tags.
pub fn registered_languages() -> Vec<&'static str> {
    vec!["go", "javascript", "python", "rust", "typescript"]
}
