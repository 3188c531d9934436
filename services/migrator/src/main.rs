//! Migration CLI (spec §6): `up | down | status | version | create <name> | validate`.
//!
//! Runs against the same `./migrations` directory the service binaries
//! embed via `sqlx::migrate!` (see `db-pool::migrate`), but loads it at
//! runtime via `Migrator::new` so `create` can add a file the currently
//! running process didn't compile against.
//!
//! Exit code 0 on success, non-zero with a single-line stderr message on
//! failure, per spec §6's CLI surface contract.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;

const MIGRATIONS_DIR: &str = "./migrations";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("migrator: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");

    // `create` never touches the database, so it doesn't need DATABASE_URL.
    if cmd == "create" {
        let name = args
            .get(2)
            .ok_or_else(|| anyhow::anyhow!("usage: migrator create <name>"))?;
        return create_migration(name);
    }

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = PgPool::connect(&database_url).await?;
    let migrator = Migrator::new(Path::new(MIGRATIONS_DIR)).await?;

    match cmd {
        "up" => {
            migrator.run(&pool).await?;
            println!("migrations applied");
        }
        "down" => {
            let target = parse_down_target(&args, &pool).await?;
            migrator.undo(&pool, target).await?;
            println!("reverted to version {target}");
        }
        "status" => print_status(&migrator, &pool).await?,
        "version" => print_version(&pool).await?,
        "validate" => {
            migrator.validate(&pool).await?;
            println!("migrations are valid");
        }
        "" => anyhow::bail!("usage: migrator <up|down|status|version|create <name>|validate>"),
        other => anyhow::bail!("unrecognized subcommand: {other}"),
    }

    Ok(())
}

/// `down` with an explicit version argument targets that version;
/// otherwise reverts exactly the most recently applied migration.
async fn parse_down_target(args: &[String], pool: &PgPool) -> anyhow::Result<i64> {
    if let Some(v) = args.get(2) {
        return Ok(v.parse()?);
    }

    let applied = applied_versions(pool).await?;
    match applied.len() {
        0 => anyhow::bail!("no migrations are applied, nothing to revert"),
        1 => Ok(0),
        n => Ok(applied[n - 2]),
    }
}

async fn applied_versions(pool: &PgPool) -> anyhow::Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(v,)| v).collect())
}

async fn print_version(pool: &PgPool) -> anyhow::Result<()> {
    match applied_versions(pool).await?.last() {
        Some(v) => println!("{v}"),
        None => println!("none"),
    }
    Ok(())
}

async fn print_status(migrator: &Migrator, pool: &PgPool) -> anyhow::Result<()> {
    let applied = applied_versions(pool).await?;
    for migration in migrator.migrations.iter() {
        let state = if applied.contains(&migration.version) {
            "applied"
        } else {
            "pending"
        };
        println!("{:<8} {:<8} {}", migration.version, state, migration.description);
    }
    Ok(())
}

/// Writes a new `<next_version>_<name>.up.sql` / `.down.sql` pair,
/// continuing the zero-padded sequential numbering already used under
/// `migrations/`.
fn create_migration(name: &str) -> anyhow::Result<()> {
    let dir = Path::new(MIGRATIONS_DIR);
    let mut max_version = 0u32;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if let Some(prefix) = file_name.split('_').next() {
            if let Ok(v) = prefix.parse::<u32>() {
                max_version = max_version.max(v);
            }
        }
    }

    let next_version = max_version + 1;
    let slug = name.trim().replace([' ', '-'], "_");
    let up_path = dir.join(format!("{next_version:04}_{slug}.up.sql"));
    let down_path = dir.join(format!("{next_version:04}_{slug}.down.sql"));

    std::fs::write(&up_path, "-- add up migration SQL here\n")?;
    std::fs::write(&down_path, "-- add down migration SQL here\n")?;

    println!("created {}", up_path.display());
    println!("created {}", down_path.display());
    Ok(())
}
