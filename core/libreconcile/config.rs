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
//
#![allow(non_snake_case)]

use crate::error::*;
use confique::{Config, FileFormat, Partial};
use std::time::Duration;

/// default location of the configuration file
pub const RECONCILE_CONFIG: &str = "/etc/sreconcile/sreconcile.conf";
const VERIFY_INTERVAL_MSEC_DEFAULT: u64 = 1000;
const QUERY_TIMEOUT_SEC_DEFAULT: u64 = 10;

/// Layered as environment, then file, then built-in defaults.
#[derive(Config, Debug)]
pub struct ReconcileConfig {
    #[config(env = "SRECONCILE_TIMEOUT_SEC", default = 60)]
    pub DefaultTimeoutSec: u64,
    #[config(default = true)]
    pub DefaultVerify: bool,
    #[config(default = 1000)] // VERIFY_INTERVAL_MSEC_DEFAULT
    pub VerifyIntervalMSec: u64,
    #[config(default = 10)] // QUERY_TIMEOUT_SEC_DEFAULT
    pub QueryTimeoutSec: u64,
    #[config(env = "SRECONCILE_SYSTEMCTL", default = "systemctl")]
    pub SystemctlPath: String,

    #[config(env = "SRECONCILE_LOG_LEVEL", default = "info")]
    pub LogLevel: String,
    #[config(default = "console")]
    pub LogTarget: String,
}

impl ReconcileConfig {
    /// Load the configuration, any layer that fails to load is skipped.
    pub fn new(file: Option<&str>) -> ReconcileConfig {
        match Self::load(file) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("failed to load configuration, using defaults: {}", e);
                ReconcileConfig::default()
            }
        }
    }

    /// Load the configuration and report the first layer that fails. A
    /// missing file is not an error.
    pub fn load(file: Option<&str>) -> Result<ReconcileConfig> {
        type ConfigPartial = <ReconcileConfig as Config>::Partial;
        let mut partial: ConfigPartial = Partial::from_env().context(ConfiqueSnafu)?;
        let from_file: ConfigPartial =
            confique::File::with_format(file.unwrap_or(RECONCILE_CONFIG), FileFormat::Toml)
                .load()
                .context(ConfiqueSnafu)?;
        partial = partial.with_fallback(from_file);
        partial = partial.with_fallback(ConfigPartial::default_values());
        let mut config = ReconcileConfig::from_partial(partial).context(ConfiqueSnafu)?;
        config.sanitize();
        Ok(config)
    }

    fn sanitize(&mut self) {
        if self.VerifyIntervalMSec == 0 {
            log::warn!(
                "VerifyIntervalMSec must be positive, using {}",
                VERIFY_INTERVAL_MSEC_DEFAULT
            );
            self.VerifyIntervalMSec = VERIFY_INTERVAL_MSEC_DEFAULT;
        }
        if self.QueryTimeoutSec == 0 {
            log::warn!(
                "QueryTimeoutSec must be positive, using {}",
                QUERY_TIMEOUT_SEC_DEFAULT
            );
            self.QueryTimeoutSec = QUERY_TIMEOUT_SEC_DEFAULT;
        }
    }

    ///
    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.VerifyIntervalMSec)
    }

    ///
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.QueryTimeoutSec)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            DefaultTimeoutSec: 60,
            DefaultVerify: true,
            VerifyIntervalMSec: VERIFY_INTERVAL_MSEC_DEFAULT,
            QueryTimeoutSec: QUERY_TIMEOUT_SEC_DEFAULT,
            SystemctlPath: "systemctl".to_string(),
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "DefaultVerify = false\nVerifyIntervalMSec = 250\nSystemctlPath = \"/usr/bin/systemctl\"\nLogTarget = \"syslog\""
        )
        .unwrap();

        let config = ReconcileConfig::load(file.path().to_str()).unwrap();
        assert!(!config.DefaultVerify);
        assert_eq!(config.verify_interval(), Duration::from_millis(250));
        assert_eq!(config.LogTarget, "syslog");
        assert_eq!(config.query_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        let config = ReconcileConfig::new(path.to_str());
        assert_eq!(config.VerifyIntervalMSec, 1000);
        assert!(config.DefaultVerify);
    }

    #[test]
    fn zero_interval_is_replaced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "VerifyIntervalMSec = 0\nQueryTimeoutSec = 0").unwrap();

        let config = ReconcileConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.verify_interval(), Duration::from_secs(1));
        assert_eq!(config.query_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DefaultVerify = \"maybe\"").unwrap();

        assert!(matches!(
            ReconcileConfig::load(file.path().to_str()),
            Err(Error::Confique { .. })
        ));
        assert!(ReconcileConfig::new(file.path().to_str()).DefaultVerify);
    }
}
