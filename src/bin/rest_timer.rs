//! Rest Timer - terminal client
//!
//! Runs one synchronized rest timer and drives it from commands typed on
//! stdin: start, pause, reset, skip, status, quit.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use rest_timer_sync::{
    config::ClientConfig,
    timer::{TerminalBell, TimerController, TimerOptions, TimerSnapshot, ToneAlert},
};

fn render(snapshot: &TimerSnapshot) -> String {
    let status = if snapshot.is_completed {
        "complete"
    } else if snapshot.is_running {
        "running"
    } else {
        "paused"
    };
    format!("{} [{:>5.1}%] {}", snapshot.formatted(), snapshot.progress(), status)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("rest_timer_sync={},rest_timer={}", config.log_level(), config.log_level()))
        .with_writer(std::io::stderr)
        .init();

    let options = TimerOptions::new(config.duration, config.exercise.clone(), config.session.clone())
        .on_tick(|remaining| println!("{:02}:{:02}", remaining / 60, remaining % 60))
        .on_complete(|| println!("Rest complete!"));
    let options = if cfg!(feature = "audio") {
        options.alert(ToneAlert::default())
    } else {
        options.alert(TerminalBell)
    };

    let mut controller = TimerController::connect(options, &config.url)?;
    info!("{} rest timer for session {} ready", config.exercise, controller.session_id());
    println!("{}", render(&controller.snapshot()));
    println!("Commands: start, pause, reset, skip, status, quit");

    // Remote changes arrive without local input; show them as they happen
    let mut updates = controller.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last = updates.borrow().clone();
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();
            if current.is_running != last.is_running || current.is_completed != last.is_completed {
                println!("{}", render(&current));
            }
            last = current;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "start" | "s" => {
                controller.start().await;
            }
            "pause" | "p" => {
                controller.pause().await;
            }
            "reset" | "r" => {
                let snapshot = controller.reset().await;
                println!("{}", render(&snapshot));
            }
            "skip" | "k" => {
                controller.skip().await;
            }
            "status" | "" => println!("{}", render(&controller.snapshot())),
            "quit" | "q" | "exit" => break,
            other => println!("Unknown command: {}", other),
        }
    }

    controller.teardown().await;
    watcher.abort();
    Ok(())
}
