//! Live metrics view for `aura-swarm monitor`.

use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::banded;
use aura_core::{Channel, ConsciousnessReading, HealthBand, Trend};
use aura_monitor::{FeedState, HttpStatusSource, MetricsFeed, MetricsMonitor, WsPushChannel};
use crossterm::{
    cursor::{Hide, MoveTo, MoveToNextLine, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute, queue,
    style::{Print, Stylize},
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

/// Run the view until the operator quits.
pub async fn run(config: &CliConfig) -> Result<(), CliError> {
    let monitor = Arc::new(MetricsMonitor::new(config.history_capacity));
    let source = HttpStatusSource::new(&config.api_base_url, config.request_timeout())
        .map_err(CliError::aura)?;
    let endpoint = config.ws_endpoint();
    let feed = MetricsFeed::new(monitor.clone(), Arc::new(source))
        .with_push(Box::new(WsPushChannel::new(endpoint.clone())))
        .with_poll_interval(config.poll_interval())
        .with_connect_timeout(config.request_timeout())
        .spawn();

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let (quit_tx, mut quit_rx) = mpsc::channel::<()>(1);
    spawn_input_reader(quit_tx);

    let mut readings = monitor.subscribe();
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        let history = monitor.history().await;
        let lines = render_lines(&history, monitor.capacity(), feed.state(), &endpoint);
        draw(&mut stdout, &lines)?;

        tokio::select! {
            _ = ticker.tick() => {}
            _ = readings.changed() => {}
            _ = quit_rx.recv() => break,
        }
    }

    feed.shutdown().await;
    Ok(())
}

/// Lines for one frame. `history` is oldest first.
pub fn render_lines(
    history: &[ConsciousnessReading],
    capacity: usize,
    state: FeedState,
    endpoint: &str,
) -> Vec<String> {
    let feed = match state {
        FeedState::Connected => format!("{} {}", "live".green(), endpoint),
        FeedState::Disconnected => format!("{} (push unavailable)", "polling".yellow()),
    };
    let mut lines = vec![
        "AURA swarm metrics".bold().to_string(),
        format!("feed     {}", feed),
        format!("history  {}/{}", history.len(), capacity),
        String::new(),
    ];

    let Some(current) = history.last() else {
        lines.push("waiting for first reading...".dark_grey().to_string());
        lines.push(String::new());
        lines.push("q / Esc / Ctrl-C to quit".dark_grey().to_string());
        return lines;
    };
    let previous = history.len().checked_sub(2).map(|i| &history[i]);

    for channel in Channel::ALL {
        let value = current.value(channel);
        let band = channel.band(value);
        let arrow = previous
            .map(|prev| Trend::between(channel, prev, current).arrow())
            .unwrap_or(" ");
        lines.push(format!(
            "{:<8} {} {} {}",
            channel.label(),
            banded(format_value(channel, value), band),
            arrow,
            band
        ));
    }

    let health = current.health();
    let band = HealthBand::from_score(health);
    lines.push(String::new());
    lines.push(format!(
        "{:<8} {} {}",
        "health",
        banded(format!("{:.1}%", health * 100.0), band),
        band
    ));
    lines.push(format!("updated  {}", current.timestamp.format("%H:%M:%S UTC")));
    lines.push(String::new());
    lines.push("q / Esc / Ctrl-C to quit".dark_grey().to_string());
    lines
}

fn format_value(channel: Channel, value: f64) -> String {
    match channel {
        Channel::Lambda => format!("{:.6e}", value),
        _ => format!("{:.4}", value),
    }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Char('q') | KeyCode::Esc => true,
        _ => false,
    }
}

fn draw(stdout: &mut io::Stdout, lines: &[String]) -> io::Result<()> {
    queue!(stdout, MoveTo(0, 0), terminal::Clear(terminal::ClearType::All))?;
    for line in lines {
        queue!(stdout, Print(line), MoveToNextLine(1))?;
    }
    stdout.flush()
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(quit: mpsc::Sender<()>) {
    std::thread::spawn(move || loop {
        if quit.is_closed() {
            break;
        }
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(Event::Key(key)) = event::read() {
                if is_quit_key(&key) {
                    let _ = quit.blocking_send(());
                    break;
                }
            }
        }
    });
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_every_channel_is_rendered(
            phi in 0.0f64..1.0,
            gamma in 0.0f64..0.2,
            w2 in 0.0f64..0.5,
            len in 1usize..5,
        ) {
            let history: Vec<_> = (0..len)
                .map(|_| ConsciousnessReading::new(phi, 2.0e-8, gamma, w2))
                .collect();
            let lines = render_lines(&history, 100, FeedState::Connected, "ws://x");
            for channel in Channel::ALL {
                prop_assert!(lines.iter().any(|l| l.starts_with(channel.label())));
            }
        }
    }
}
