use clap::Parser;
use rook_keyring::{
    cli::{self, ApplyArguments, Command, IdentityArguments, Opts, RenderArguments, ShowArguments},
    client::KubeSecretClient,
    cluster::ClusterInfo,
    keyring, logging,
    registry::{self, KeyringRegistry},
    volume,
};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::info;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    Logging { source: logging::Error },

    #[snafu(display("invalid arguments"))]
    Arguments { source: cli::Error },

    #[snafu(display("failed to render the keyring"))]
    Render { source: keyring::Error },

    #[snafu(display("failed to create the Kubernetes client"))]
    KubeClient { source: kube::Error },

    #[snafu(display("keyring operation failed"))]
    Keyring { source: registry::Error },

    #[snafu(display("the stored keyring has no section header"))]
    MissingPrincipal,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    logging::initialize_logging(cli::LOG_ENV, cli::APP_NAME).context(LoggingSnafu)?;

    match opts.command {
        Command::Render(args) => render(&args),
        Command::Paths(args) => paths(&args),
        Command::Apply(args) => apply(args).await,
        Command::Show(args) => show(args).await,
    }
}

fn render(args: &RenderArguments) -> Result<(), Error> {
    let identity = args.identity.identity().context(ArgumentsSnafu)?;
    let secret = args.secret.read_secret().context(ArgumentsSnafu)?;

    print!(
        "{}",
        keyring::render(&identity, &secret).context(RenderSnafu)?
    );
    Ok(())
}

fn paths(args: &IdentityArguments) -> Result<(), Error> {
    let identity = args.identity().context(ArgumentsSnafu)?;

    println!("secret: {}", identity.secret_name());
    println!("volume: {}", identity.volume_name());
    println!("mount:  {}", identity.mount_dir());
    println!("file:   {}", volume::file_path(&identity));
    Ok(())
}

async fn apply(args: ApplyArguments) -> Result<(), Error> {
    let identity = args.identity.identity().context(ArgumentsSnafu)?;
    let secret = args.secret.read_secret().context(ArgumentsSnafu)?;
    let owner = args.owner.owner_reference().context(ArgumentsSnafu)?;

    let cluster_info = ClusterInfo::new(args.client.namespace).with_secret(secret);
    let client = kube::Client::try_default().await.context(KubeClientSnafu)?;
    let keyrings = KeyringRegistry::new(
        KubeSecretClient::new(client, Some(args.client.field_manager)),
        &cluster_info,
        owner,
    );

    let outcome = keyrings
        .get(identity.clone())
        .create_or_update_with_key(&cluster_info.ceph_cred.secret)
        .await
        .context(KeyringSnafu)?;
    info!(
        keyring.identity = %identity,
        k8s.secret.name = %identity.secret_name(),
        ?outcome,
        "applied keyring"
    );
    println!("{}: {outcome:?}", identity.secret_name());
    Ok(())
}

async fn show(args: ShowArguments) -> Result<(), Error> {
    let identity = args.identity.identity().context(ArgumentsSnafu)?;

    let cluster_info = ClusterInfo::new(args.client.namespace);
    let client = kube::Client::try_default().await.context(KubeClientSnafu)?;
    let keyrings = KeyringRegistry::new(
        KubeSecretClient::new(client, Some(args.client.field_manager)),
        &cluster_info,
        Default::default(),
    );

    let stored = keyrings
        .get(identity.clone())
        .keyring()
        .await
        .context(KeyringSnafu)?;
    let principal = keyring::parse_principal(&stored).context(MissingPrincipalSnafu)?;
    println!("{}: {principal}", identity.secret_name());
    Ok(())
}
