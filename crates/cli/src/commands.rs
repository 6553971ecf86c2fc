use anyhow::{Context, Result, bail};

use stockledger_core::{ProductId, sort_by_id};
use stockledger_infra::{LedgerConfig, LedgerServices, SqliteLedgerStore};
use stockledger_interchange::{CsvImporter, LowStockExporter, XmlExporter, XmlImporter};
use stockledger_inventory::{NewProduct, Price, ProductFields};

use crate::Commands;
use crate::render;

type Services = LedgerServices<SqliteLedgerStore>;

pub async fn run(services: &Services, config: &LedgerConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            name,
            category,
            price,
            stock,
        } => {
            let id = services
                .registry
                .create(NewProduct::new(name, category, Price::new(price), stock))
                .await
                .context("could not create product")?;
            println!("created product {id}");
        }
        Commands::List => {
            let mut products = services.registry.list_all().await?;
            sort_by_id(&mut products);
            render::products(&products);
        }
        Commands::Show { id, name } => {
            let product = match (id, name) {
                (Some(id), _) => services.registry.find_by_id(ProductId::new(id)).await?,
                (None, Some(name)) => services.registry.find_by_name(&name).await?,
                (None, None) => bail!("pass a product id or --name"),
            };
            render::products(std::slice::from_ref(&product));
        }
        Commands::Update {
            id,
            name,
            category,
            price,
            stock,
        } => update(services, ProductId::new(id), name, category, price, stock).await?,
        Commands::Entry { id, quantity } => {
            let movement = services
                .engine
                .apply_entry(ProductId::new(id), quantity)
                .await
                .context("entry rejected")?;
            render::movements(std::slice::from_ref(&movement));
        }
        Commands::Exit { id, quantity } => {
            let movement = services
                .engine
                .apply_exit(ProductId::new(id), quantity)
                .await
                .context("exit rejected")?;
            render::movements(std::slice::from_ref(&movement));
        }
        Commands::SetStock { id, stock } => {
            let reconciliation = services
                .engine
                .reconcile_to(ProductId::new(id), stock)
                .await
                .context("stock change rejected")?;
            render::reconciliation(&reconciliation);
        }
        Commands::Delete { id, yes } => {
            if !yes {
                bail!("deleting product {id} also deletes its movement history; pass --yes to confirm");
            }
            let deletion = services
                .engine
                .delete_product_cascade(ProductId::new(id))
                .await?;
            println!(
                "deleted product {} and {} movement(s)",
                deletion.product_id, deletion.movements_deleted
            );
        }
        Commands::History { id } => {
            let movements = services.ledger.query_by_product(ProductId::new(id)).await?;
            render::movements(&movements);
        }
        Commands::Report { from, to } => {
            let rows = services.ledger.query_by_date_range(&from, &to).await?;
            render::report(&rows);
        }
        Commands::Top { limit } => {
            let ranking = services.query.top_selling_products(limit).await?;
            render::top_sellers(&ranking);
        }
        Commands::Categories => {
            let rows = services.query.stock_by_category().await?;
            render::categories(&rows);
        }
        Commands::Balance { id } => {
            let id = ProductId::new(id);
            let product = services.registry.find_by_id(id).await?;
            let balance = services.query.ledger_balance(id).await?;
            render::balance(&product, &balance);
        }
        Commands::ImportCsv { file, error_log } => {
            let error_log = error_log.unwrap_or_else(|| config.csv_error_log.clone());
            let report = CsvImporter::new(services.bulk.clone())
                .import_file(&file, &error_log)
                .await
                .with_context(|| format!("csv import from {} failed", file.display()))?;
            println!("imported {} product(s)", report.products_inserted);
        }
        Commands::ExportJson { threshold, output } => {
            let count = LowStockExporter::new(services.query.clone())
                .export_to_file(threshold, &output)
                .await?;
            println!("exported {count} product(s) to {}", output.display());
        }
        Commands::ExportXml { output } => {
            XmlExporter::new(services.registry.clone())
                .export_to_file(&output)
                .await?;
            println!("inventory exported to {}", output.display());
        }
        Commands::ImportXml { file, yes } => {
            if !yes {
                bail!("importing replaces every product and drops all movements; pass --yes to confirm");
            }
            let report = XmlImporter::new(services.bulk.clone())
                .replace_from_file(&file)
                .await
                .with_context(|| format!("xml import from {} failed", file.display()))?;
            println!(
                "replaced {} product(s) with {}",
                report.products_removed, report.products_inserted
            );
        }
    }
    Ok(())
}

/// Unset flags keep the product's current values.
async fn update(
    services: &Services,
    id: ProductId,
    name: Option<String>,
    category: Option<String>,
    price: Option<String>,
    stock: Option<i64>,
) -> Result<()> {
    let current = services.registry.find_by_id(id).await?;
    let fields = ProductFields::new(
        name.unwrap_or_else(|| current.name().to_string()),
        category.unwrap_or_else(|| current.category().to_string()),
        Price::new(price.unwrap_or_else(|| current.price().as_str().to_string())),
    );

    let reconciliation = services
        .engine
        .edit_product(id, fields, stock)
        .await
        .context("update rejected")?;

    println!("product {id} updated");
    if let Some(reconciliation) = reconciliation {
        render::reconciliation(&reconciliation);
    }
    Ok(())
}
