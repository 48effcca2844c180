//! Logger setup for binaries and tests embedding the library.

use std::io::Write;

/// Installs an `env_logger` backend writing `[timestamp] LEVEL message` lines.
///
/// `RUST_LOG` overrides `default_level`. Returns false when a logger was
/// already installed.
pub fn init(default_level: &str) -> bool {
    let env = env_logger::Env::default().default_filter_or(default_level);
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .is_ok()
}
