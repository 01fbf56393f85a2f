// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! sreconcile: bring one service to the desired state and print the result
//! as json.

use clap::{ArgEnum, Parser};
use log::LevelFilter;
use nix::sys::signal::{SigSet, Signal};
use nix::errno::Errno;
use reconcile::config::RECONCILE_CONFIG;
use reconcile::logger;
use reconcile::{
    CancelToken, DesiredSpec, DesiredState, Error, ReconcileConfig, ReconcileContext,
    ReconciliationResult, Reconciler, Result, SystemCtl,
};
use std::process::exit;

/// signals that abort a running reconciliation
const CANCEL_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Name of the service to manage
    #[clap(required = true)]
    name: String,

    /// Desired state of the service
    #[clap(short, long, arg_enum, default_value = "started")]
    state: StateArg,

    /// Whether the service should start on boot, left untouched if not given
    #[clap(short, long, parse(try_from_str))]
    enabled: Option<bool>,

    /// Verify the service is actually running after a start
    #[clap(long, conflicts_with = "no-verify")]
    verify: bool,

    /// Do not wait for the service to become active after a start
    #[clap(long)]
    no_verify: bool,

    /// Timeout in seconds for each service operation
    #[clap(short, long)]
    timeout: Option<u64>,

    /// Only report what would change
    #[clap(long)]
    check: bool,

    /// Configuration file
    #[clap(short, long)]
    config: Option<String>,

    /// Log level, overrides the configuration
    #[clap(long)]
    log_level: Option<String>,
}

#[derive(ArgEnum, Clone, Copy, Debug)]
enum StateArg {
    Started,
    Stopped,
    Restarted,
    Reloaded,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Started => DesiredState::Started,
            StateArg::Stopped => DesiredState::Stopped,
            StateArg::Restarted => DesiredState::Restarted,
            StateArg::Reloaded => DesiredState::Reloaded,
        }
    }
}

/// The first cancel signal cancels the run, another one while the run is
/// still winding down asks for an immediate exit. Returns true for the
/// latter.
fn on_cancel_signal(cancel: &CancelToken, sig: Signal) -> bool {
    if cancel.is_cancelled() {
        log::error!("received {:?} again, exiting", sig);
        return true;
    }
    log::warn!("received {:?}, cancelling", sig);
    cancel.cancel();
    false
}

/// Block the cancel signals in every thread and handle them on a dedicated
/// thread. Must run before any other thread is spawned.
fn register_cancel_signals(cancel: CancelToken) -> nix::Result<()> {
    let mut set = SigSet::empty();
    for sig in CANCEL_SIGNALS {
        set.add(sig);
    }
    set.thread_block()?;

    std::thread::spawn(move || loop {
        match set.wait() {
            Ok(sig) => {
                if on_cancel_signal(&cancel, sig) {
                    exit(Errno::ECANCELED as i32);
                }
            }
            Err(e) => {
                log::error!("failed to wait for signals: {}", e);
                return;
            }
        }
    });
    Ok(())
}

/// Load the configuration, falling back to the defaults. The failure is
/// handed back to be logged once the logger is up.
fn load_config(file: Option<&str>) -> (ReconcileConfig, Option<Error>) {
    match ReconcileConfig::load(file) {
        Ok(v) => (v, None),
        Err(e) => (ReconcileConfig::default(), Some(e)),
    }
}

/// command line first, then the configuration
fn desired_spec(args: &Args, config: &ReconcileConfig) -> Result<DesiredSpec> {
    let verify = if args.no_verify {
        false
    } else {
        args.verify || config.DefaultVerify
    };

    DesiredSpec::new(
        &args.name,
        args.state.into(),
        args.enabled,
        verify,
        args.timeout.unwrap_or(config.DefaultTimeoutSec),
    )
}

fn run(args: &Args, config: &ReconcileConfig, cancel: CancelToken) -> Result<ReconciliationResult> {
    let spec = desired_spec(args, config)?;

    let systemctl = SystemCtl::from_config(config);
    let ctx = ReconcileContext::new(&systemctl, &systemctl)
        .with_cancel(cancel)
        .with_verify_interval(config.verify_interval());

    let mut reconciler = Reconciler::new(&ctx, spec);
    if args.check {
        reconciler.check()
    } else {
        reconciler.reconcile()
    }
}

fn main() {
    let args = Args::parse();

    let (config, config_err) = load_config(args.config.as_deref());
    let level = args.log_level.as_deref().unwrap_or(&config.LogLevel);
    let level = match logger::parse_level(level) {
        Some(v) => v,
        None => {
            eprintln!("unsupported log level '{}', set log level to info", level);
            LevelFilter::Info
        }
    };
    logger::init_log("sreconcile", level, &config.LogTarget);
    if let Some(e) = config_err {
        log::warn!(
            "failed to load {}, using defaults: {}",
            args.config.as_deref().unwrap_or(RECONCILE_CONFIG),
            e
        );
    }

    let cancel = CancelToken::new();
    if let Err(e) = register_cancel_signals(cancel.clone()) {
        log::warn!("failed to register cancel signals: {}", e);
    }

    let result = match run(&args, &config, cancel) {
        Err(e) => {
            eprintln!("{}", e);
            exit(e.get_errno());
        }
        Ok(v) => v,
    };

    match serde_json::to_string(&result) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Failed to serialize result: {}", e);
            exit(Errno::EIO as i32);
        }
    }
}
