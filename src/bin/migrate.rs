use retail_pos_api::db::{create_pool, orm_from_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // The server config also requires JWT_SECRET; migrations only need the database.
    let database_url = std::env::var("DATABASE_URL")?;
    let orm = orm_from_pool(create_pool(&database_url).await?);
    run_migrations(&orm).await?;
    println!("Migrations applied");
    Ok(())
}
