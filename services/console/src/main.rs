//! doser-console CLI
//!
//! Watch mode renders live device state; the other subcommands are
//! one-shot edits against the device API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use doser_console::{load_config, Config};
use doser_proto::{DayMask, MqttConfig};

#[derive(Parser)]
#[command(name = "doser-console")]
#[command(about = "Console client for a multi-pump dosing controller")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the device, listen for push frames, render state (default)
    Watch,
    /// Edit one pump's settings; each flag posts the full pump list
    Pump {
        /// Zero-based pump index
        index: usize,
        #[arg(long)]
        enabled: Option<bool>,
        /// Flow calibration in ml/s
        #[arg(long)]
        calibration: Option<f64>,
        /// Dose volume in ml
        #[arg(long)]
        dose: Option<f64>,
        /// Hour of day the dose runs, 0-23
        #[arg(long)]
        hour: Option<u8>,
        /// Weekday mask, bit 0 = Sunday .. bit 6 = Saturday
        #[arg(long)]
        days: Option<u8>,
    },
    /// Save MQTT broker settings
    Mqtt {
        #[arg(long)]
        server: String,
        #[arg(long, default_value_t = 1883)]
        port: u16,
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long, default_value = "")]
        password: String,
        /// Use the legacy multipart /save-mqtt endpoint
        #[arg(long)]
        legacy: bool,
    },
    /// Trigger a manual dose on one pump (1-based id)
    Test { id: usize },
    /// Reboot the device
    Reboot,
    /// Restore factory defaults
    FactoryReset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(host) = args.host {
        config.device.host = host;
    }

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            tracing::info!(
                "Watching {} (push channel {})",
                config.device.http_base(),
                config.device.ws_url()
            );
            doser_console::run(config).await?;
        }
        Command::Pump {
            index,
            enabled,
            calibration,
            dose,
            hour,
            days,
        } => {
            let ctx = doser_console::command_context(&config).await;
            if let Some(enabled) = enabled {
                ctx.dispatcher.set_pump_enabled(index, enabled).await;
            }
            if let Some(calibration) = calibration {
                ctx.dispatcher.set_pump_calibration(index, calibration).await;
            }
            if let Some(dose) = dose {
                ctx.dispatcher.set_pump_dose(index, dose).await;
            }
            if let Some(hour) = hour {
                ctx.dispatcher.set_pump_hour(index, hour).await;
            }
            if let Some(days) = days {
                ctx.dispatcher
                    .set_pump_days(index, DayMask::new(days))
                    .await;
            }
        }
        Command::Mqtt {
            server,
            port,
            user,
            password,
            legacy,
        } => {
            let ctx = doser_console::command_context(&config).await;
            let mqtt = MqttConfig {
                server,
                port,
                user,
                password,
            };
            if legacy {
                ctx.dispatcher.save_mqtt_form(&mqtt).await;
            } else {
                ctx.dispatcher.save_mqtt(mqtt).await;
            }
        }
        Command::Test { id } => {
            let ctx = doser_console::command_context(&config).await;
            ctx.dispatcher.test_pump(id).await;
        }
        Command::Reboot => {
            let ctx = doser_console::command_context(&config).await;
            ctx.dispatcher.reboot().await;
        }
        Command::FactoryReset => {
            let ctx = doser_console::command_context(&config).await;
            ctx.dispatcher.factory_reset().await;
        }
    }

    Ok(())
}
