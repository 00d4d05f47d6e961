use anyhow::Result;
use dynattr_database_types::Introspection;
use dynattr_graphql::{executor::NoopExecutor, schema::build_schema};
use dynattr_lib::{
    config::{Parser, SchemaArgs, SchemaConfig},
    utils::init_logging,
};
use std::{fs::File, io::BufReader, sync::Arc};
use tracing::info;

pub fn main() -> Result<()> {
    let opt = SchemaArgs::parse();

    let introspection_path = opt.introspection.clone();
    let config = match opt.config.clone() {
        Some(path) => SchemaConfig::from_file(path)?,
        None => {
            let config = SchemaConfig::from(opt);
            config.validate()?;
            config
        }
    };

    init_logging(&config)?;

    info!("Reading introspection result from {introspection_path:?}");
    let introspection: Introspection =
        serde_json::from_reader(BufReader::new(File::open(&introspection_path)?))?;

    let schema = build_schema(&introspection, &config, Arc::new(NoopExecutor))?;
    println!("{}", schema.sdl());

    Ok(())
}
