mod session;
mod state;

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use wlshell::{
    reexports::calloop::{
        timer::{TimeoutAction, Timer},
        EventLoop,
    },
    shell::{ping::insert_heartbeat, ShellConfig},
};

pub use state::Shellvil;

/// Headless compositor replaying a scripted wl_shell session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Interval between two heartbeats, in milliseconds
    #[arg(long, default_value_t = 1000)]
    ping_interval: u64,
    /// Unanswered pings after which a client is flagged unresponsive
    #[arg(long, default_value_t = 3)]
    max_pending_pings: usize,
    /// Keep popups open on key presses outside of them
    #[arg(long)]
    keep_popups_on_key: bool,
    /// Smallest width proposed during interactive resizes
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..))]
    min_width: i32,
    /// Smallest height proposed during interactive resizes
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..))]
    min_height: i32,
    /// Delay between two steps of the session, in milliseconds
    #[arg(long, default_value_t = 100)]
    step: u64,
    /// The scripted client never answers pings
    #[arg(long)]
    unresponsive: bool,
}

impl Cli {
    fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            ping_interval: Duration::from_millis(self.ping_interval),
            max_pending_pings: self.max_pending_pings,
            popup_dismiss_on_key: !self.keep_popups_on_key,
            min_size: (self.min_width, self.min_height).into(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().init();
    }

    let mut event_loop: EventLoop<Shellvil> = EventLoop::try_new()?;
    let config = cli.shell_config();
    let mut state = Shellvil::new(config.clone(), event_loop.get_signal(), !cli.unresponsive);

    insert_heartbeat(&event_loop.handle(), config.ping_interval, |state| &mut state.shell)
        .map_err(|err| err.error)?;

    let step_interval = Duration::from_millis(cli.step);
    let mut steps = session::script().into_iter();
    event_loop
        .handle()
        .insert_source(Timer::from_duration(step_interval), move |_, _, state| {
            state.answer_pings();
            match steps.next() {
                Some(step) => {
                    if let Err(err) = state.run_step(&step) {
                        warn!(?step, %err, "Session step failed");
                    }
                    TimeoutAction::ToDuration(step_interval)
                }
                None => {
                    info!("Session finished");
                    state.loop_signal.stop();
                    TimeoutAction::Drop
                }
            }
        })
        .map_err(|err| err.error)?;

    event_loop.run(None, &mut state, |_| {
        // Shellvil is running
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use wlshell::utils::Size;

    #[test]
    fn min_size_must_be_positive() {
        for arg in ["--min-width=-5", "--min-height=0"] {
            assert!(Cli::try_parse_from(["shellvil", arg]).is_err(), "{arg} was accepted");
        }

        let cli = Cli::try_parse_from(["shellvil", "--min-width=200", "--min-height=100"]).unwrap();
        assert_eq!(cli.shell_config().min_size, Size::from((200, 100)));
    }
}
