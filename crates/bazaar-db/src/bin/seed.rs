//! # Seed Data Generator
//!
//! Populates the database with development data: a demo admin, a demo
//! customer, and a product catalog across categories.
//!
//! ## Usage
//! ```bash
//! # Default database path (./bazaar_dev.db), full catalog
//! cargo run -p bazaar-db --bin seed
//!
//! # Custom path and product count
//! cargo run -p bazaar-db --bin seed -- --db ./data/shop.db --count 40
//! ```
//!
//! Skips seeding when products already exist, so it is safe to run on
//! every development start.

use std::env;

use tracing::info;

use bazaar_core::query::Filter;
use bazaar_core::{NewProduct, NewUser, Role};
use bazaar_db::{Database, DbConfig};

/// (category, [(name, description, price_cents, stock)])
const CATALOG: &[(&str, &[(&str, &str, i64, i64)])] = &[
    (
        "Skincare",
        &[
            ("Vitamin C Serum", "Brightening serum with 10% vitamin C", 1999, 25),
            ("Hyaluronic Moisturizer", "Lightweight daily hydration", 1499, 40),
            ("Mineral Sunscreen SPF 50", "Zinc oxide, reef safe", 1299, 35),
            ("Clay Cleansing Mask", "Deep-pore kaolin clay mask", 999, 20),
            ("Retinol Night Cream", "Gentle 0.3% retinol complex", 2499, 15),
        ],
    ),
    (
        "Bath",
        &[
            ("Oat Milk Bath Soak", "Colloidal oatmeal and lavender", 899, 30),
            ("Charcoal Bar Soap", "Activated charcoal cold-process bar", 450, 60),
            ("Eucalyptus Shower Steamer", "Six-pack of shower steamers", 1099, 25),
            ("Bamboo Bath Brush", "Long-handle exfoliating brush", 750, 18),
        ],
    ),
    (
        "Supplements",
        &[
            ("Vitamin D Gummies", "2000 IU, 90 count", 1299, 50),
            ("Magnesium Glycinate", "120 capsules for sleep support", 1599, 45),
            ("Omega-3 Fish Oil", "Triple strength, 60 softgels", 1899, 30),
            ("Probiotic Complex", "10 strains, shelf stable", 2199, 22),
        ],
    ),
    (
        "Home",
        &[
            ("Soy Candle - Cedar", "45 hour burn, cotton wick", 1650, 28),
            ("Linen Spray - Lavender", "Calming pillow and linen mist", 950, 33),
            ("Ceramic Oil Diffuser", "Ultrasonic, auto shutoff", 3299, 12),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = usize::MAX;
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(usize::MAX);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Maximum products to insert (default: all)");
                println!("  -d, --db <PATH>    Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding development database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count(&Filter::new()).await?;
    if existing > 0 {
        info!(existing, "Database already has products; skipping seed");
        return Ok(());
    }

    // Demo accounts. The hashes are placeholders — real hashing lives in
    // the auth layer, which re-seeds credentials for local logins.
    let admin = db
        .users()
        .create(NewUser {
            email: "admin@bazaar.test".into(),
            username: "admin".into(),
            password_hash: "dev-only-admin-hash".into(),
            role: Some(Role::Admin),
        })
        .await?;
    let customer = db
        .users()
        .create(NewUser {
            email: "customer@bazaar.test".into(),
            username: "customer".into(),
            password_hash: "dev-only-customer-hash".into(),
            role: None,
        })
        .await?;
    info!(admin = %admin.username, customer = %customer.username, "Demo accounts created");

    let mut inserted = 0usize;
    'outer: for (category, products) in CATALOG {
        for (name, description, price_cents, stock) in products.iter() {
            if inserted >= count {
                break 'outer;
            }

            db.products()
                .create(NewProduct {
                    name: (*name).to_string(),
                    description: Some((*description).to_string()),
                    price_cents: *price_cents,
                    image_url: None,
                    category: (*category).to_string(),
                    stock: Some(*stock),
                })
                .await?;
            inserted += 1;
        }
    }

    info!(inserted, "Seed complete");

    let categories = db.products().categories().await?;
    info!(categories = ?categories, "Available categories");

    db.close().await;
    Ok(())
}
