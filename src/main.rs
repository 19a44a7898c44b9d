use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vox::config::EngineConfig;
use vox::outputs::console::{ConsoleEngines, DEFAULT_MS_PER_CHAR};
use vox::{DialogChannels, DialogService};

const HELP: &str = "\
  !        press the activation control
  <text>   speak <text> while listening (blank line = nothing recognized)
  /mute    narration engine becomes unavailable
  /unmute  narration engine comes back
  /quit    exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Vox dialog engine booting...");

    let config = EngineConfig::from_env()?;
    let (service, channels) = DialogService::from_config(&config)?;
    let DialogChannels {
        handle,
        mut effects,
        mut commands,
        mut listening,
    } = channels;

    let service_task = tokio::spawn(service.run());
    let mut engines = ConsoleEngines::new(handle.clone(), DEFAULT_MS_PER_CHAR);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");

    loop {
        tokio::select! {
            Some(effect) = effects.recv() => engines.apply(effect),
            Some(command) = commands.recv() => println!("[ACTION] {:?}", command),
            Ok(()) = listening.changed() => {
                let on = *listening.borrow_and_update();
                println!("[MIC] {}", if on { "listening" } else { "off" });
            }
            line = lines.next_line() => match line? {
                Some(line) => match line.trim() {
                    "/quit" => break,
                    "!" => handle.activate().await,
                    "/mute" => handle.narration_ready(false).await,
                    "/unmute" => handle.narration_ready(true).await,
                    _ => engines.line(&line).await,
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    let reactor = service_task.await?;
    let snap = reactor.telemetry.snapshot();
    info!(
        "Session: {} captures, {} commands decoded, {} answers matched, {} rejections",
        snap.capture_stats.started,
        snap.decode_stats.navigations + snap.decode_stats.follow_ups + snap.decode_stats.immediate,
        snap.decode_stats.answers_matched,
        snap.dialogue_stats.rejections,
    );

    Ok(())
}
