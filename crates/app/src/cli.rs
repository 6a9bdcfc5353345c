use std::path::{Path, PathBuf};

use glowmask_core::{GlowConfig, Interpolation};
use tracing_subscriber::filter::LevelFilter;

use crate::logging::parse_level;

#[derive(Debug)]
pub(crate) enum Command {
    Help,
    Run(BatchArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub log_level: LevelFilter,
}

/// Values given on the command line win over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConfigOverrides {
    pub mesa: Option<bool>,
    pub interpolation: Option<Interpolation>,
    pub downsample_factor: Option<u32>,
    pub grid_extent: Option<u32>,
    pub upsample_factor: Option<u32>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut GlowConfig) {
        if let Some(mesa) = self.mesa {
            config.mesa = mesa;
        }
        if let Some(interpolation) = self.interpolation {
            config.interpolation = interpolation;
        }
        if let Some(factor) = self.downsample_factor {
            config.downsample_factor = factor;
        }
        if let Some(extent) = self.grid_extent {
            config.grid_extent = extent;
        }
        if let Some(factor) = self.upsample_factor {
            config.upsample_factor = factor;
        }
    }
}

pub(crate) fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut output = None;
    let mut config_path = None;
    let mut overrides = ConfigOverrides::default();
    let mut log_level = LevelFilter::INFO;
    // Skip the program name.
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--input" | "-i" => input = Some(PathBuf::from(value_for(arg, iter.next())?)),
            "--output" | "-o" => output = Some(PathBuf::from(value_for(arg, iter.next())?)),
            "--config" => config_path = Some(PathBuf::from(value_for(arg, iter.next())?)),
            "--mesa" => overrides.mesa = Some(true),
            "--no-mesa" => overrides.mesa = Some(false),
            "--interpolation" => {
                let value = value_for(arg, iter.next())?;
                let interpolation = value
                    .parse::<Interpolation>()
                    .map_err(|err| err.to_string())?;
                overrides.interpolation = Some(interpolation);
            }
            "--downsample" => {
                overrides.downsample_factor = Some(parse_u32(arg, value_for(arg, iter.next())?)?)
            }
            "--extent" => {
                overrides.grid_extent = Some(parse_u32(arg, value_for(arg, iter.next())?)?)
            }
            "--upsample" => {
                overrides.upsample_factor = Some(parse_u32(arg, value_for(arg, iter.next())?)?)
            }
            "--log-level" => log_level = parse_level(value_for(arg, iter.next())?)?,
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("unknown argument {other}")),
        }
    }

    let input = input.ok_or_else(|| "--input is required".to_string())?;
    let output = output.ok_or_else(|| "--output is required".to_string())?;
    Ok(Command::Run(BatchArgs {
        input,
        output,
        config_path,
        overrides,
        log_level,
    }))
}

pub(crate) fn print_help() {
    println!(
        "glowmask: turn binary contour volumes into normalized glow fields\n\n\
         Usage: glowmask --input <file|dir> --output <dir> [options]\n\n\
         Options:\n  \
         --config <path>          JSON glow configuration\n  \
         --mesa                   pin the contour interior to 1.0\n  \
         --no-mesa                plain normalization, even if the config enables mesa\n  \
         --interpolation <name>   nearest | linear | gaussian\n  \
         --downsample <factor>    coarse grid downsample factor\n  \
         --extent <voxels>        coarse grid size per axis\n  \
         --upsample <factor>      upsample factor for the coarse glow\n  \
         --log-level <level>      off | error | warn | info | debug | trace\n  \
         --help"
    );
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<GlowConfig, String> {
    let Some(path) = path else {
        return Ok(GlowConfig::default());
    };
    let data = std::fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("{}: {err}", path.display()))
}

fn value_for<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str, String> {
    value
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_u32(flag: &str, value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|_| format!("{flag} expects a positive integer, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("glowmask")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_full_command_line() {
        let command = parse_args(&args(&[
            "--input",
            "masks",
            "-o",
            "out",
            "--mesa",
            "--interpolation",
            "linear",
            "--downsample",
            "4",
            "--extent",
            "16",
            "--upsample",
            "3",
            "--log-level",
            "debug",
        ]))
        .expect("parse");
        let Command::Run(parsed) = command else {
            panic!("expected run command");
        };
        assert_eq!(parsed.input, PathBuf::from("masks"));
        assert_eq!(parsed.output, PathBuf::from("out"));
        assert_eq!(parsed.log_level, LevelFilter::DEBUG);
        assert_eq!(
            parsed.overrides,
            ConfigOverrides {
                mesa: Some(true),
                interpolation: Some(Interpolation::Linear),
                downsample_factor: Some(4),
                grid_extent: Some(16),
                upsample_factor: Some(3),
            }
        );
    }

    #[test]
    fn help_short_circuits() {
        assert!(matches!(
            parse_args(&args(&["--help"])),
            Ok(Command::Help)
        ));
    }

    #[test]
    fn reports_missing_and_bad_values() {
        assert!(parse_args(&args(&["--input", "a"])).is_err());
        assert!(parse_args(&args(&["--input"])).is_err());
        assert!(parse_args(&args(&["-i", "a", "-o", "b", "--downsample", "x"])).is_err());
        assert!(parse_args(&args(&["-i", "a", "-o", "b", "--interpolation", "cubic"])).is_err());
        assert!(parse_args(&args(&["-i", "a", "-o", "b", "--bogus"])).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = GlowConfig::default();
        let overrides = ConfigOverrides {
            mesa: Some(true),
            grid_extent: Some(16),
            ..ConfigOverrides::default()
        };
        overrides.apply(&mut config);
        assert!(config.mesa);
        assert_eq!(config.grid_extent, 16);
        assert_eq!(config.downsample_factor, GlowConfig::default().downsample_factor);
    }

    #[test]
    fn no_mesa_flag_turns_off_config_mesa() {
        let Command::Run(parsed) =
            parse_args(&args(&["-i", "a", "-o", "b", "--no-mesa"])).expect("parse")
        else {
            panic!("expected run command");
        };
        assert_eq!(parsed.overrides.mesa, Some(false));

        let mut config = GlowConfig {
            mesa: true,
            ..GlowConfig::default()
        };
        parsed.overrides.apply(&mut config);
        assert!(!config.mesa);

        let mut config = GlowConfig {
            mesa: true,
            ..GlowConfig::default()
        };
        ConfigOverrides::default().apply(&mut config);
        assert!(config.mesa);
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None), Ok(GlowConfig::default()));
    }
}
