use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::DEBUG_MODE;
use crate::config::{Config, General};
use crate::errors::GridMinInitError;
use crate::manager_goodwe::GoodWe;
use crate::manager_influx::Influx;
use crate::manager_mail::Mail;
use crate::manager_sems::Sems;
use crate::manager_solcast::Solcast;
use crate::manager_tibber::Tibber;

/// The managers the worker talks to.
pub struct Mgr {
    pub tibber: Tibber,
    pub solcast: Solcast,
    pub sems: Sems,
    pub goodwe: GoodWe,
    pub influx: Influx,
    pub mail: Mail,
}

/// Sets up logging, the debug flag and the managers.
///
/// # Arguments
///
/// * 'config' - the validated configuration
pub fn init(config: &Config) -> Result<Mgr, GridMinInitError> {
    init_logging(&config.general)?;

    log::info!("gridmin version {}", env!("CARGO_PKG_VERSION"));

    *DEBUG_MODE.write().map_err(|e| GridMinInitError(e.to_string()))? = config.general.debug_mode;
    if config.general.debug_mode {
        log::info!("running in debug mode, the inverter will not be touched");
    }

    let mgr = Mgr {
        tibber: Tibber::new(&config.tibber)?,
        solcast: Solcast::new(&config.solcast),
        sems: Sems::new(&config.sems),
        goodwe: GoodWe::new(&config.inverter),
        influx: Influx::new(&config.influx),
        mail: Mail::new(&config.mail)?,
    };

    Ok(mgr)
}

/// Configures log4rs with a file appender and optionally stdout.
///
/// # Arguments
///
/// * 'general' - the general configuration section
fn init_logging(general: &General) -> Result<(), GridMinInitError> {
    let pattern = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}";

    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(&general.log_path)?;

    let mut builder = log4rs::Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(pattern)))
            .build();

        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    let log_config = builder.build(root.build(general.log_level))?;
    log4rs::init_config(log_config)?;

    Ok(())
}
