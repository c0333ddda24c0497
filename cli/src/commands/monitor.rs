use color_eyre::eyre::Result;

use crate::config::UserConfig;
use crate::monitor::{self, MonitorOptions};

pub fn run(
    mut config: UserConfig,
    json: bool,
    capacity_mah: Option<f64>,
    interval_secs: Option<u64>,
    no_store: bool,
) -> Result<()> {
    config.merge_with_args(capacity_mah, interval_secs);
    config.estimator.validate()?;

    monitor::run(
        config,
        MonitorOptions {
            json,
            store: !no_store,
        },
    )
}
