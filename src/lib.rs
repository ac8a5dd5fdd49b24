/*!
Local identity and update-notification core for a learning-management
front end.

The two collaborating pieces are the [`session::SessionStore`], which
owns the one authenticated identity for the running process and the
durable registry of known users behind it, and the [`bus::UpdateBus`],
which lets decoupled views learn that a locally persisted collection
changed without polling. Both sit on top of the [`storage::Storage`]
key-value boundary, so a process decides once whether its state lives
in memory or in a file on disk.
*/

pub mod auth;
pub mod bus;
pub mod collections;
pub mod config;
pub mod session;
pub mod storage;
pub mod user;

pub fn log_level_from_env() -> simplelog::LevelFilter {
    use simplelog::LevelFilter;

    let mut level_string = match std::env::var("LOG_LEVEL") {
        Err(_) => { return LevelFilter::Warn; },
        Ok(s) => s,
    };

    level_string.make_ascii_lowercase();
    match level_string.as_str() {
        "max" => LevelFilter::max(),
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}
