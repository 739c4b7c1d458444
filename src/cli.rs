use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use crate::compound::DataSet;
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::interpolation_table::Interpolator;
use crate::material_balance::{fenske_minimum_stages, MaterialBalance};
use crate::report;
use crate::temperature::TemperatureScale;
use crate::volatility::{self, BatchPolicy, KeyComponents, VolatilityRequest, VolatilityTable};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "FUG shortcut distillation design: K-value interpolation, relative volatilities and material balances."
)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = config::DEFAULT_PATH)]
    pub config: PathBuf,

    /// Directory of the per-compound K-value tables, overriding the configuration.
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Log more, repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the compounds and their temperature ranges.
    Compounds,
    /// Interpolate the K-value of one compound.
    Interpolate {
        #[arg(long)]
        compound: String,
        #[arg(long, allow_hyphen_values = true)]
        temperature: f64,
        /// Scale of the given temperature, if it differs from the tables.
        #[arg(long, value_enum)]
        scale: Option<TemperatureScale>,
    },
    /// Tabulate K-values and relative volatilities at the column temperatures.
    KValues {
        #[command(flatten)]
        column: ColumnArgs,
        /// Where to export the table.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute the mole fractions of the configured flows.
    Fractions {
        /// Where to export the table.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Estimate the minimum number of stages with the Fenske equation.
    Fenske {
        #[command(flatten)]
        column: ColumnArgs,
    },
    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Overrides of the column conditions in the configuration.
#[derive(Args, Debug, Default)]
pub struct ColumnArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub feed: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub top: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub bottom: Option<f64>,
    /// Scale of the given temperatures, if it differs from the tables.
    #[arg(long, value_enum)]
    pub scale: Option<TemperatureScale>,
    #[arg(long)]
    pub light_key: Option<String>,
    #[arg(long)]
    pub heavy_key: Option<String>,
    /// Stop at the first compound that cannot be interpolated.
    #[arg(long)]
    pub abort_on_error: bool,
}

impl ColumnArgs {
    fn apply(&self, config: &mut Config) {
        let table_scale = config.temperature_scale;
        let scale = self.scale.unwrap_or(table_scale);
        let temperatures = &mut config.temperatures;
        for (target, value) in [
            (&mut temperatures.feed, self.feed),
            (&mut temperatures.top, self.top),
            (&mut temperatures.bottom, self.bottom),
        ] {
            if let Some(value) = value {
                *target = scale.convert(value, table_scale);
            }
        }

        if let Some(light_key) = &self.light_key {
            config.keys.light = Some(light_key.clone());
        }
        if let Some(heavy_key) = &self.heavy_key {
            config.keys.heavy = Some(heavy_key.clone());
        }
        if self.abort_on_error {
            config.batch.on_error = BatchPolicy::Abort;
        }
    }
}

fn load_data(config: &Config) -> Result<DataSet> {
    let data = DataSet::load_dir(&config.data_dir)?;
    if let Some((min, max)) = data.temperature_range() {
        let temperatures = config.column_temperatures();
        for temperature in [temperatures.feed, temperatures.top, temperatures.bottom] {
            if temperature < min || temperature > max {
                warn!("{temperature} lies outside of all K-value tables ({min} - {max})");
            }
        }
    }
    Ok(data)
}

fn volatility_table(config: &Config, data: &DataSet) -> Result<VolatilityTable> {
    let request = VolatilityRequest {
        temperatures: config.column_temperatures(),
        keys: config.key_components(data)?,
        membership: config.stream_membership(data),
        interpolator: config.interpolation,
        policy: config.batch.on_error,
    };
    volatility::evaluate(data, &request)
}

/// The light key, its average relative volatility and the Fenske minimum number of stages.
fn minimum_stages(config: &Config, data: &DataSet) -> Result<(KeyComponents, f64, f64)> {
    let table = volatility_table(config, data)?;
    let keys = table.keys();
    let alpha_light = table
        .row(&keys.light)
        .and_then(|row| row.alpha_average)
        .ok_or_else(|| {
            Error::FenskeUndefined(format!(
                "no relative volatility of the light key {}",
                keys.light
            ))
        })?;
    let balance = MaterialBalance::new(&config.flows)?;
    let stages = fenske_minimum_stages(&balance, keys, alpha_light)?;
    Ok((keys.clone(), alpha_light, stages))
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let scale = config.temperature_scale;

    match cli.command {
        Command::Compounds => {
            let data = load_data(&config)?;
            for compound in data.compounds() {
                let (min, max) = compound.curve().bounds();
                println!(
                    "{}: {} samples from {} to {}",
                    compound.name(),
                    compound.curve().len(),
                    scale.format(min, 2),
                    scale.format(max, 2)
                );
            }
            if let Some((min, max)) = data.temperature_range() {
                println!(
                    "All tables: {} to {}",
                    scale.format(min, 2),
                    scale.format(max, 2)
                );
            }
        }
        Command::Interpolate {
            compound,
            temperature,
            scale: query_scale,
        } => {
            let data = load_data(&config)?;
            let table = data.require(&compound)?;
            let temperature = query_scale.unwrap_or(scale).convert(temperature, scale);
            let interpolator: Interpolator = config.interpolation;
            let k_value = interpolator
                .interpolate(table.curve(), temperature)
                .map_err(|source| Error::Compound {
                    compound: compound.clone(),
                    source,
                })?;
            println!("K({compound}, {}) = {k_value:.2}", scale.format(temperature, 2));
        }
        Command::KValues { column, output } => {
            column.apply(&mut config);
            let data = load_data(&config)?;
            let table = volatility_table(&config, &data)?;
            print!("{table}");
            report::export_k_values(output.as_ref().unwrap_or(&config.output.k_values), &table)?;
        }
        Command::Fractions { output } => {
            if config.flows.is_empty() {
                warn!("No flow rates configured in {:?}", cli.config);
            }
            let balance = MaterialBalance::new(&config.flows)?;
            println!("{balance}");
            report::export_fractions(
                output.as_ref().unwrap_or(&config.output.fractions),
                &balance,
            )?;
        }
        Command::Fenske { column } => {
            column.apply(&mut config);
            let data = load_data(&config)?;
            let (keys, alpha_light, stages) = minimum_stages(&config, &data)?;
            println!(
                "Light key {} (alpha {alpha_light:.2}), heavy key {}: at least {stages:.2} stages",
                keys.light, keys.heavy
            );
        }
        Command::InitConfig { force } => {
            if cli.config.exists() && !force {
                return Err(Error::ConfigExists(cli.config));
            }
            config.save(&cli.config)?;
            info!("Wrote {:?}", cli.config);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;

    use clap::Parser;
    use tempfile::TempDir;

    use super::{minimum_stages, run, Cli, ColumnArgs, Command};
    use crate::compound::DataSet;
    use crate::config::Config;
    use crate::error::{Error, InterpolationError};
    use crate::temperature::TemperatureScale;
    use crate::volatility::BatchPolicy;

    #[test]
    fn parse() {
        let cli = Cli::try_parse_from([
            "fug",
            "-vv",
            "k-values",
            "--feed",
            "-10",
            "--heavy-key",
            "Butane",
            "--abort-on-error",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::KValues { column, output } = cli.command else {
            panic!("expected k-values, got {:?}", cli.command);
        };
        assert_eq!(column.feed, Some(-10.0));
        assert_eq!(column.heavy_key.as_deref(), Some("Butane"));
        assert!(column.abort_on_error);
        assert!(output.is_none());
    }

    #[test]
    fn column_overrides() {
        let mut config = Config::default();
        let column = ColumnArgs {
            feed: Some(100.0),
            scale: Some(TemperatureScale::Celsius),
            light_key: Some("Propane".to_string()),
            abort_on_error: true,
            ..Default::default()
        };
        column.apply(&mut config);

        assert!((config.temperatures.feed - 212.0).abs() < 1e-9);
        assert_eq!(config.temperatures.top, 300.0);
        assert_eq!(config.keys.light.as_deref(), Some("Propane"));
        assert_eq!(config.batch.on_error, BatchPolicy::Abort);
    }

    const COLUMN: &str = r#"
        [temperatures]
        feed = 150.0
        top = 200.0
        bottom = 130.0

        [keys]
        light = "Propane"
        heavy = "Butane"
        distillate = ["Propane", "Butane"]
        bottoms = ["Propane", "Butane"]

        [flows.feed]
        Propane = 50.0
        Butane = 50.0

        [flows.top]
        Propane = 45.0
        Butane = 5.0

        [flows.bottom]
        Propane = 5.0
        Butane = 45.0
    "#;

    /// A data directory with propane and butane tables from 100 to 250 degrees.
    fn data_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir).unwrap();
        fs::write(
            data_dir.join("1_propane.csv"),
            "T,Propane\n100,1.0\n150,1.5\n200,1.8\n250,2.0\n",
        )
        .unwrap();
        fs::write(
            data_dir.join("2_butane.csv"),
            "T,Butane\n100,0.5\n150,0.7\n200,0.9\n250,1.0\n",
        )
        .unwrap();
        dir
    }

    fn cli(dir: &Path, command: &[&str]) -> Cli {
        let mut args: Vec<OsString> = vec![
            "fug".into(),
            "--config".into(),
            dir.join("fug.toml").into(),
            "--data-dir".into(),
            dir.join("data").into(),
        ];
        args.extend(command.iter().map(OsString::from));
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn k_values_end_to_end() {
        let dir = data_dir();
        let output = dir.path().join("k.csv");
        run(cli(
            dir.path(),
            &["k-values", "--top", "200", "--output", output.to_str().unwrap()],
        ))
        .unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Propane,1.50,N/A,1.80,"));
        assert!(lines[2].starts_with("Butane,0.70,N/A,0.90,1.00,N/A,1.00,1.00"));
    }

    #[test]
    fn interpolate_in_another_scale() {
        let dir = data_dir();
        let interpolate = |temperature: &str, scale: &str| {
            run(cli(
                dir.path(),
                &[
                    "interpolate",
                    "--compound",
                    "Propane",
                    "--temperature",
                    temperature,
                    "--scale",
                    scale,
                ],
            ))
        };

        interpolate("150", "fahrenheit").unwrap();
        // 90 °C is 194 °F
        interpolate("90", "celsius").unwrap();
        // 150 °C is 302 °F
        let error = interpolate("150", "celsius").unwrap_err();
        assert!(
            matches!(
                &error,
                Error::Compound {
                    source: InterpolationError::OutOfRange { query, min, max },
                    ..
                } if (query - 302.0).abs() < 1e-9 && *min == 100.0 && *max == 250.0
            ),
            "{error:?}"
        );
    }

    #[test]
    fn fractions_export() {
        let dir = data_dir();
        fs::write(dir.path().join("fug.toml"), COLUMN).unwrap();
        let output = dir.path().join("fractions.csv");
        run(cli(
            dir.path(),
            &["fractions", "--output", output.to_str().unwrap()],
        ))
        .unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines[1..],
            [
                "Butane,50,0.5,5,0.1,45,0.9",
                "Propane,50,0.5,45,0.9,5,0.1"
            ]
        );
    }

    #[test]
    fn fenske_stages() {
        let dir = data_dir();
        let config: Config = toml::from_str(COLUMN).unwrap();
        let data = DataSet::load_dir(&dir.path().join("data")).unwrap();

        let (keys, alpha_light, stages) = minimum_stages(&config, &data).unwrap();
        assert_eq!(keys.light, "Propane");
        // Mean of 1.5 / 0.7, 1.3296 / 0.6144 and 1.8 / 0.9
        assert!((alpha_light - 2.1023065476190474).abs() < 1e-9);
        assert!((stages - 81f64.ln() / alpha_light.ln()).abs() < 1e-10);
        assert!((stages - 5.914187858122535).abs() < 1e-8);

        fs::write(dir.path().join("fug.toml"), COLUMN).unwrap();
        run(cli(dir.path(), &["fenske"])).unwrap();
    }

    #[test]
    fn fenske_light_key_below_heavy_key() {
        let dir = data_dir();
        fs::write(dir.path().join("fug.toml"), COLUMN).unwrap();
        let error = run(cli(
            dir.path(),
            &["fenske", "--light-key", "Butane", "--heavy-key", "Propane"],
        ))
        .unwrap_err();
        assert!(matches!(error, Error::FenskeUndefined(_)), "{error:?}");
    }

    #[test]
    fn fenske_without_light_key_volatility() {
        let dir = data_dir();
        fs::write(
            dir.path().join("data").join("0_ethane.csv"),
            "T,Ethane\n100,3.0\n140,3.5\n",
        )
        .unwrap();
        fs::write(dir.path().join("fug.toml"), COLUMN).unwrap();

        // The feed at 150 lies outside of the ethane table
        let error = run(cli(dir.path(), &["fenske", "--light-key", "Ethane"])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "the Fenske equation is undefined: no relative volatility of the light key Ethane"
        );
    }

    #[test]
    fn init_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fug.toml");

        run(cli(dir.path(), &["init-config"])).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        fs::write(&path, COLUMN).unwrap();
        let error = run(cli(dir.path(), &["init-config"])).unwrap_err();
        assert!(matches!(&error, Error::ConfigExists(existing) if existing == &path));
        assert_eq!(fs::read_to_string(&path).unwrap(), COLUMN);

        run(cli(dir.path(), &["init-config", "--force"])).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.keys.light.as_deref(), Some("Propane"));
        assert_eq!(config.temperatures.top, 200.0);
    }
}
