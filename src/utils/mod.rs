#[cfg(feature = "sqlite")]
pub mod crypto;
#[cfg(feature = "sqlite")]
pub mod sqlx_helper;

use once_cell::sync::OnceCell;
use std::env;
use tracing_subscriber::EnvFilter;

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// The file is the first command line argument, or `.env` when none is given.
/// A missing file is not an error: plain environment variables still apply.
/// Returns the path that was tried.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::args().nth(1).unwrap_or_else(|| ".env".to_string());
    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });
    dotenv_path
}

/// Installs the global tracing subscriber.
///
/// Honors `RUST_LOG` (default `info`); `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
