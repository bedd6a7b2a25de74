use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use eobs_core::config::parse_offsets;
use eobs_core::constants::DEFAULT_NEWS_MODULE;
use eobs_core::demo::write_document;
use eobs_core::{
    generate_admissions, generate_news, generate_placements, GeneratorConfig, OffsetSource,
    RiskDistribution, Roster, WardStrategy,
};
use eobs_rpc::{ConnectionConfig, DischargeTransferCoordinator, SmokeTest};
use eobs_types::{parse_text_list, NonEmptyText};
use openerp::{DateMode, FixtureDocument};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "eobs")]
#[command(about = "Open eObs demo data generator and setup tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate admission data for a ward roster
    Admissions {
        #[command(flatten)]
        generate: GenerateArgs,
    },
    /// Generate bed placement data for a ward roster
    Placements {
        #[command(flatten)]
        generate: GenerateArgs,
    },
    /// Generate NEWS observation data for a ward roster
    News {
        #[command(flatten)]
        generate: GenerateArgs,
        /// Patients per risk, e.g. high=2,medium=3,low=5,none=10
        #[arg(long)]
        risk: RiskDistribution,
        /// Module that defines the admission data referenced by the observations
        #[arg(long, default_value = DEFAULT_NEWS_MODULE)]
        module: String,
    },
    /// Discharge patients from a ward
    Discharge {
        /// Ward code
        #[arg(long)]
        ward: NonEmptyText,
        /// Patient identifiers (comma-separated)
        #[arg(long)]
        patients: String,
        /// Transfer the same patients from the ward to this ward afterwards
        #[arg(long)]
        transfer_to: Option<NonEmptyText>,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Transfer patients between wards
    Transfer {
        /// Ward the patients are on
        #[arg(long = "from")]
        from_ward: NonEmptyText,
        /// Ward to move the patients to
        #[arg(long = "to")]
        to_ward: NonEmptyText,
        /// Patient identifiers (comma-separated)
        #[arg(long)]
        patients: String,
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Run smoke tests against a database
    SmokeTest {
        /// Database to run tests against
        #[arg(default_value = "nhclinical")]
        database: String,
        /// Server to run tests against
        #[arg(long, env = "EOBS_SERVER", default_value = "http://localhost:8069")]
        server: String,
        /// User to run tests as
        #[arg(long, default_value = "adt")]
        user: String,
        /// Password for the testing user
        #[arg(long, default_value = "adt", hide_default_value = true)]
        password: String,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Roster file (demo_patients.xml)
    roster: PathBuf,
    /// Admission day offsets, one per patient (e.g. -1,-2,-1)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "offset_choices")]
    offsets: Option<String>,
    /// Draw each patient's offset from these choices instead
    #[arg(long, allow_hyphen_values = true, requires = "seed")]
    offset_choices: Option<String>,
    /// Seed for --offset-choices
    #[arg(long)]
    seed: Option<u64>,
    /// Write to this file instead of standard output
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Write literal timestamps computed now instead of loader expressions
    #[arg(long)]
    absolute_dates: bool,
}

impl GenerateArgs {
    fn offset_source(&self) -> anyhow::Result<OffsetSource> {
        match (&self.offsets, &self.offset_choices, self.seed) {
            (Some(offsets), None, _) => Ok(OffsetSource::Fixed(parse_offsets(offsets)?)),
            (None, Some(choices), Some(seed)) => Ok(OffsetSource::Random {
                choices: parse_offsets(choices)?,
                seed,
            }),
            _ => anyhow::bail!("either --offsets or --offset-choices with --seed is required"),
        }
    }

    fn config(&self, module: &str) -> anyhow::Result<GeneratorConfig> {
        let date_mode = if self.absolute_dates {
            DateMode::Absolute(chrono::Local::now().naive_local())
        } else {
            DateMode::Eval
        };
        Ok(GeneratorConfig::new(date_mode, module)?)
    }

    /// Reads the roster and resolves one offset per patient.
    fn load(&self) -> anyhow::Result<(Roster, Vec<i64>)> {
        let roster = Roster::read(&self.roster)?;
        let offsets = self.offset_source()?.resolve(roster.len())?;
        tracing::debug!(
            roster = %self.roster.display(),
            patients = roster.len(),
            ?offsets,
            "loaded roster"
        );
        Ok((roster, offsets))
    }

    fn emit(&self, document: &FixtureDocument) -> anyhow::Result<()> {
        match &self.output {
            Some(path) => {
                write_document(path, document)?;
                println!("Wrote {}", path.display());
            }
            None => print!("{}", document.render()?),
        }
        Ok(())
    }
}

#[derive(Args)]
struct ConnectionArgs {
    /// Server address (with XML-RPC port)
    #[arg(long, env = "EOBS_SERVER", default_value = "http://localhost:8069")]
    server: String,
    /// Database name
    #[arg(long, env = "EOBS_DATABASE", default_value = "openerp")]
    database: String,
    /// User to connect as
    #[arg(long, env = "EOBS_USER", default_value = "admin")]
    user: String,
    /// Password for the user
    #[arg(
        long,
        env = "EOBS_PASSWORD",
        default_value = "admin",
        hide_env_values = true,
        hide_default_value = true
    )]
    password: String,
}

impl ConnectionArgs {
    fn config(&self) -> anyhow::Result<ConnectionConfig> {
        Ok(ConnectionConfig::new(
            &self.server,
            &self.database,
            &self.user,
            &self.password,
        )?)
    }
}

fn patients(list: &str) -> anyhow::Result<Vec<NonEmptyText>> {
    let patients = parse_text_list(list).context("invalid --patients")?;
    anyhow::ensure!(!patients.is_empty(), "--patients cannot be empty");
    Ok(patients)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eobs_core=warn".parse()?)
                .add_directive("eobs_rpc=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Admissions { generate }) => {
            let (roster, offsets) = generate.load()?;
            let config = generate.config(DEFAULT_NEWS_MODULE)?;
            let document = generate_admissions(&config, &roster, &offsets)
                .with_context(|| {
                    format!("generating admissions for {}", generate.roster.display())
                })?;
            generate.emit(&document)?;
        }
        Some(Commands::Placements { generate }) => {
            let (roster, offsets) = generate.load()?;
            let config = generate.config(DEFAULT_NEWS_MODULE)?;
            let document = generate_placements(&config, &roster, &offsets)
                .with_context(|| {
                    format!("generating placements for {}", generate.roster.display())
                })?;
            generate.emit(&document)?;
        }
        Some(Commands::News {
            generate,
            risk,
            module,
        }) => {
            let (roster, offsets) = generate.load()?;
            let config = generate.config(&module)?;
            let mut strategy = WardStrategy::from_roster(&roster, &offsets, risk)?;
            let document = generate_news(&config, &mut strategy)
                .with_context(|| {
                    format!("generating NEWS for {}", generate.roster.display())
                })?;
            generate.emit(&document)?;
        }
        Some(Commands::Discharge {
            ward,
            patients: list,
            transfer_to,
            connection,
        }) => {
            let mut coordinator = DischargeTransferCoordinator::new(ward.clone(), patients(&list)?);
            if let Some(to_ward) = transfer_to {
                coordinator = coordinator.with_transfer_ward(to_ward);
            }
            coordinator.run(connection.config()?)?;
            println!("Discharged {} patient(s) from {}", coordinator.patients.len(), ward);
            if let Some(to_ward) = &coordinator.transfer_ward {
                println!("Transferred them from {} to {}", ward, to_ward);
            }
        }
        Some(Commands::Transfer {
            from_ward,
            to_ward,
            patients: list,
            connection,
        }) => {
            let patients = patients(&list)?;
            let client = eobs_rpc::OpenErpClient::connect(connection.config()?)?;
            eobs_rpc::transfer_patients(&client, &from_ward, &to_ward, &patients)?;
            println!(
                "Transferred {} patient(s) from {} to {}",
                patients.len(),
                from_ward,
                to_ward
            );
        }
        Some(Commands::SmokeTest {
            database,
            server,
            user,
            password,
        }) => {
            let config = ConnectionConfig::new(server, database, user, password)?;
            let report = SmokeTest::new(config).run();
            eprint!("{report}");
            if !report.passed() {
                std::process::exit(1);
            }
        }
        None => {
            println!("Use 'eobs --help' for commands");
        }
    }

    Ok(())
}
