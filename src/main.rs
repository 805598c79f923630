use clap::Parser;
use credplane::cli::Cli;
use credplane::config::ProvisioningConfig;
use credplane::db::MySqlProvisioner;
use credplane::observability::{init_logging, LoggingConfig};
use credplane::pipeline::Pipeline;
use credplane::stores::aws::AwsSecretsStore;
use credplane::stores::kubernetes::KubernetesSecretsStore;
use credplane::{APP_NAME, VERSION};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Environment loading must happen before any config is read.
    cli.load_env_file()?;

    let logging = LoggingConfig::from_env();
    init_logging(&logging, cli.verbose)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting credential provisioning run");

    let config = match ProvisioningConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(error = %error, "Refusing to start with invalid configuration");
            std::process::exit(1);
        }
    };
    info!(
        host = %config.database.host,
        schema = %config.database.schema,
        grants = %config.grants.join(","),
        namespace = %config.stores.namespace,
        "Loaded provisioning configuration"
    );

    let pipeline = Pipeline::new(
        MySqlProvisioner::new(config.database.clone()),
        AwsSecretsStore::from_env().await,
        KubernetesSecretsStore::new(
            config.stores.kubeconfig.clone(),
            config.stores.namespace.clone(),
        ),
    );

    match pipeline.run(&config).await {
        Ok(report) => {
            info!(
                user = %report.username,
                primary_secret = %report.primary_secret_name,
                secondary_secret = %report.secondary_secret_name,
                "Provisioning completed"
            );
            Ok(())
        }
        Err(failure) => {
            error!(
                stage = %failure.stage,
                error = %failure,
                "Provisioning pipeline failed; resources created by earlier stages are left in place"
            );
            std::process::exit(1);
        }
    }
}
