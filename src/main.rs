use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use veml6030_rs::helpers::running_average::SampleReporter;
use veml6030_rs::helpers::settings::Settings;
use veml6030_rs::veml6030::{linux::LinuxBus, LuxSource, Veml6030};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::parse();
    info!(
        "veml6030 {} on {} at {:#04x}",
        env!("CARGO_PKG_VERSION"),
        settings.bus.display(),
        settings.address
    );

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> anyhow::Result<()> {
    let source = if settings.read_back {
        LuxSource::Register
    } else {
        LuxSource::Cached
    };
    let sensor = Veml6030::<LinuxBus>::new().with_lux_source(source);
    sensor
        .init_with_config(&settings.bus, settings.address, settings.config())
        .with_context(|| {
            format!(
                "could not initialize VEML6030 on {}; are you using the right port?",
                settings.bus.display()
            )
        })?;

    let result = poll(&sensor, settings);
    if let Err(e) = sensor.deinit() {
        warn!("Deinit failed: {e}");
    }
    result
}

fn poll(sensor: &Veml6030<LinuxBus>, settings: &Settings) -> anyhow::Result<()> {
    sensor
        .set_power_saving(settings.power_saving())
        .context("could not set power-saving mode")?;

    let conf = sensor
        .access_config()
        .context("could not read configuration")?;
    println!(
        "Config: {:04x}, {:04x}, {:04x}, {:04x}",
        conf.gain, conf.integration_time, conf.persistence, conf.shutdown
    );

    let it_ms = u64::from(settings.integration_time.as_ms());
    if settings.interval_ms < it_ms {
        warn!(
            "Sampling every {} ms with {} ms integration time repeats readings",
            settings.interval_ms, it_ms
        );
    }

    let every = usize::from(settings.report_every);
    let mut als_reporter = SampleReporter::new(settings.window, every);
    let mut white_reporter = SampleReporter::new(settings.window, every);
    let interval = Duration::from_millis(settings.interval_ms);

    let mut taken: u32 = 0;
    while settings.samples == 0 || taken < settings.samples {
        let als = sensor.access_als().context("could not access ALS")?;
        let white = sensor.access_white().context("could not access white")?;
        println!("ALS: {als:.4}, White: {white:.4}");

        if let Some(avg) = als_reporter.push(als) {
            info!("ALS average: {avg:.4} lux");
        }
        if let Some(avg) = white_reporter.push(white) {
            info!("White average: {avg:.4} lux");
        }

        taken = taken.saturating_add(1);
        thread::sleep(interval);
    }
    Ok(())
}
