//! 命令行定义
//!
//! 子命令按 Provider 目录动态生成：
//!
//! ```text
//! flare-sync [--log-level L] [--log-json] <source> <registry> [OPTIONS] once|watch
//! flare-sync [--log-level L] [--log-json] from-config <FILE> once|watch
//! ```
//!
//! 每个 Provider 配置项对应一个 `--<source|registry>-<key>` 参数，
//! 并可通过环境变量 `FLARE_SYNC_<FLAG>` 提供。

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use flare_registry_sync::config::{
    DEFAULT_INTERVAL, LoggingConfig, ManagerConfig, ProviderConfig, SchedulerConfig, SyncConfig,
    format_duration, parse_duration,
};
use flare_registry_sync::provider::{OptionSpec, ProviderCatalog, ProviderKind, ProviderOptions};
use flare_registry_sync::runtime::RunMode;

const ENV_PREFIX: &str = "FLARE_SYNC";

const ARG_LOG_LEVEL: &str = "log-level";
const ARG_LOG_JSON: &str = "log-json";
const ARG_EXIT_ON_ERROR: &str = "exit-on-error";
const ARG_INTERVAL: &str = "interval";
const ARG_FILE: &str = "file";

const CMD_FROM_CONFIG: &str = "from-config";
const CMD_ONCE: &str = "once";
const CMD_WATCH: &str = "watch";

/// 参数名对应的环境变量名：`log-level` → `FLARE_SYNC_LOG_LEVEL`
pub fn env_name(flag: &str) -> String {
    format!("{}_{}", ENV_PREFIX, flag.replace('-', "_").to_uppercase())
}

/// 构建命令行
pub fn build(catalog: &ProviderCatalog) -> Command {
    let mut cli = Command::new("flare-sync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keep a service registry consistent with a declared list of services")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long(ARG_LOG_LEVEL)
                .env(env_name(ARG_LOG_LEVEL))
                .value_name("LEVEL")
                .default_value("info")
                .help("Log level or filter directive (RUST_LOG takes precedence)"),
        )
        .arg(
            Arg::new(ARG_LOG_JSON)
                .long(ARG_LOG_JSON)
                .env(env_name(ARG_LOG_JSON))
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new(CMD_FROM_CONFIG)
                .about("Run with source and registry taken from a TOML config file")
                .subcommand_required(true)
                .arg(
                    Arg::new(ARG_FILE)
                        .value_name("FILE")
                        .required(true)
                        .help("Path to the TOML config file"),
                )
                .subcommands(mode_commands(None)),
        );

    for source in catalog.sources() {
        let mut source_cmd = Command::new(source.name().to_string())
            .about(source.description().to_string())
            .subcommand_required(true);

        for registry in catalog.registries() {
            let mut cmd = Command::new(registry.name().to_string())
                .about(registry.description().to_string())
                .subcommand_required(true)
                .arg(
                    Arg::new(ARG_EXIT_ON_ERROR)
                        .long(ARG_EXIT_ON_ERROR)
                        .env(env_name(ARG_EXIT_ON_ERROR))
                        .action(ArgAction::SetTrue)
                        .help("Fail the run on the first batch with per-service errors"),
                );
            for spec in source.options() {
                cmd = cmd.arg(option_arg(ProviderKind::Source, spec));
            }
            for spec in registry.options() {
                cmd = cmd.arg(option_arg(ProviderKind::Registry, spec));
            }
            source_cmd =
                source_cmd.subcommand(cmd.subcommands(mode_commands(Some(DEFAULT_INTERVAL))));
        }

        cli = cli.subcommand(source_cmd);
    }

    cli
}

fn option_arg(kind: ProviderKind, spec: &OptionSpec) -> Arg {
    let flag = format!("{}-{}", kind.prefix(), spec.key);
    let mut arg = Arg::new(flag.clone())
        .long(flag.clone())
        .env(env_name(&flag))
        .value_name("VALUE")
        .help(spec.help.clone());
    if let Some(default) = &spec.default {
        arg = arg.default_value(default.clone());
    }
    arg
}

fn mode_commands(default_interval: Option<Duration>) -> [Command; 2] {
    let mut interval = Arg::new(ARG_INTERVAL)
        .long(ARG_INTERVAL)
        .env(env_name(ARG_INTERVAL))
        .value_name("DURATION")
        .value_parser(parse_interval)
        .help("Interval between reconciliation runs (e.g. 30s, 1m, 1h)");
    if let Some(default) = default_interval {
        interval = interval.default_value(format_duration(default));
    }

    [
        Command::new(CMD_ONCE).about("Run a single reconciliation and exit"),
        Command::new(CMD_WATCH)
            .about("Run reconciliation periodically until a shutdown signal")
            .arg(interval),
    ]
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

/// 将解析结果转换为运行配置
pub fn resolve(catalog: &ProviderCatalog, matches: &ArgMatches) -> Result<(SyncConfig, RunMode)> {
    let (mut config, mode) = match matches.subcommand() {
        Some((CMD_FROM_CONFIG, sub)) => {
            let file = sub
                .get_one::<String>(ARG_FILE)
                .context("config file is required")?;
            let mut config = SyncConfig::load_from_file(file)
                .with_context(|| format!("failed to load config from {}", file))?;
            let (mode, mode_matches) = run_mode(sub)?;
            if let Some(interval) = interval(mode, mode_matches) {
                config.scheduler.interval = interval;
            }
            (config, mode)
        }
        Some((source_name, source_matches)) => {
            let (registry_name, sub) = source_matches
                .subcommand()
                .context("registry subcommand is required")?;
            let source = catalog.lookup_source(source_name)?;
            let registry = catalog.lookup_registry(registry_name)?;

            let (mode, mode_matches) = run_mode(sub)?;
            let config = SyncConfig {
                source: ProviderConfig {
                    kind: source_name.to_string(),
                    options: collect_options(sub, ProviderKind::Source, source.options()),
                },
                registry: ProviderConfig {
                    kind: registry_name.to_string(),
                    options: collect_options(sub, ProviderKind::Registry, registry.options()),
                },
                manager: ManagerConfig {
                    exit_on_error: sub.get_flag(ARG_EXIT_ON_ERROR),
                },
                scheduler: SchedulerConfig {
                    interval: interval(mode, mode_matches).unwrap_or(DEFAULT_INTERVAL),
                },
                logging: LoggingConfig::default(),
            };
            (config, mode)
        }
        None => bail!("a subcommand is required"),
    };

    // 显式给出的日志参数覆盖配置文件
    if matches.value_source(ARG_LOG_LEVEL) != Some(ValueSource::DefaultValue) {
        if let Some(level) = matches.get_one::<String>(ARG_LOG_LEVEL) {
            config.logging.level = level.clone();
        }
    }
    if matches.get_flag(ARG_LOG_JSON) {
        config.logging.json = true;
    }

    Ok((config, mode))
}

fn run_mode(matches: &ArgMatches) -> Result<(RunMode, &ArgMatches)> {
    match matches.subcommand() {
        Some((CMD_ONCE, sub)) => Ok((RunMode::Once, sub)),
        Some((CMD_WATCH, sub)) => Ok((RunMode::Watch, sub)),
        _ => bail!("expected \"{}\" or \"{}\"", CMD_ONCE, CMD_WATCH),
    }
}

fn interval(mode: RunMode, matches: &ArgMatches) -> Option<Duration> {
    match mode {
        RunMode::Watch => matches.get_one::<Duration>(ARG_INTERVAL).copied(),
        RunMode::Once => None,
    }
}

fn collect_options(matches: &ArgMatches, kind: ProviderKind, specs: &[OptionSpec]) -> ProviderOptions {
    let mut options = ProviderOptions::new();
    for spec in specs {
        let flag = format!("{}-{}", kind.prefix(), spec.key);
        if let Some(value) = matches.get_one::<String>(&flag) {
            options.insert(spec.key.clone(), value.clone());
        }
    }
    options
}
