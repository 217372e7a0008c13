//! Seed the database with the admin account and the starter catalog.
//!
//! Safe to run repeatedly: the admin account is created only if missing
//! (and granted `Admin` if it lost the role), and products are inserted only
//! into an empty catalog.
//!
//! # Environment Variables
//!
//! - `VELVET_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)
//! - `VELVET_ADMIN_PASSWORD` - Password for `admin@velvet.shop`

use rust_decimal::Decimal;
use tracing::info;

use velvet_api::db::{ProductRepository, UserRepository};
use velvet_core::{Email, NewProduct, Role};

use super::user::create_with_password;
use super::{CommandError, connect, required_env};

/// Username and email of the seeded administrator.
const ADMIN_USERNAME: &str = "admin@velvet.shop";

/// Starter catalog: name, description, price in cents, category.
const CATALOG: &[(&str, &str, i64, &str)] = &[
    ("Classic Vibrator", "Silky smooth finish, multi-speed.", 2999, "Toys"),
    ("Rabbit Vibe", "Dual stimulation calling for fun.", 4550, "Toys"),
    ("G-Spot Wand", "Powerful vibrations where you need them.", 5500, "Toys"),
    ("Silicone Dildo", "Realistic feel and easy to clean.", 3500, "Toys"),
    ("Anal Plug Set", "Beginner friendly set of 3 sizes.", 2500, "Toys"),
    ("Couple's Ring", "Enhance intimacy for both partners.", 1500, "Toys"),
    ("Lace Teddy", "Elegant red lace teddy.", 3999, "Lingerie"),
    ("Silk Robe", "Luxurious black silk robe.", 5999, "Lingerie"),
    ("Fishnet Stockings", "Classic fishnet design.", 1200, "Lingerie"),
    ("Leather Harness", "Edgy and bold accessory.", 4900, "Lingerie"),
    ("Satin Panties", "Soft touch satin, various colors.", 1800, "Lingerie"),
    ("Corset Top", "Structuring corset for a defined waist.", 4500, "Lingerie"),
    ("Water Based Lube", "Natural feel, non-sticky formula.", 999, "Essentials"),
    ("Silicone Lube", "Long lasting, waterproof.", 1499, "Essentials"),
    ("Massage Oil", "Relaxing lavender scent.", 1999, "Essentials"),
    ("Toy Cleaner", "Antibacterial spray for toy care.", 850, "Essentials"),
    ("Condom Pack", "Pack of 12, ultra thin.", 1000, "Essentials"),
    ("Blindfold", "Soft satin blindfold for sensory play.", 700, "Essentials"),
];

/// Seed the admin account and catalog.
pub async fn run() -> Result<(), CommandError> {
    let password = required_env("VELVET_ADMIN_PASSWORD")?;
    let pool = connect().await?;

    let users = UserRepository::new(&pool);
    match users.get_by_username(ADMIN_USERNAME).await? {
        Some(admin) => {
            users.add_role(admin.id, Role::Admin).await?;
            info!(user_id = %admin.id, "Admin account already present");
        }
        None => {
            let email = Email::parse(ADMIN_USERNAME)
                .map_err(|_| CommandError::InvalidEmail(ADMIN_USERNAME.to_owned()))?;
            let admin =
                create_with_password(&pool, ADMIN_USERNAME, email, &password, Role::Admin).await?;
            info!(user_id = %admin.id, "Created admin account {ADMIN_USERNAME}");
        }
    }

    let products = ProductRepository::new(&pool);
    if products.count().await? > 0 {
        info!("Catalog already populated, skipping products");
        return Ok(());
    }

    for product in catalog() {
        products.create(&product).await?;
    }
    info!(products = CATALOG.len(), "Seeded catalog");

    Ok(())
}

/// Build the starter catalog.
fn catalog() -> Vec<NewProduct> {
    CATALOG
        .iter()
        .map(|&(name, description, cents, category)| NewProduct {
            name: name.to_owned(),
            description: description.to_owned(),
            price: Decimal::new(cents, 2),
            category: category.to_owned(),
            image_url: placeholder_image(name),
        })
        .collect()
}

/// Placeholder image URL with the product name as caption.
fn placeholder_image(name: &str) -> String {
    let caption: String = name
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();
    format!("https://placehold.co/300x400?text={caption}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 18);
        assert!(catalog.iter().all(|p| p.validate().is_ok()));

        for category in ["Toys", "Lingerie", "Essentials"] {
            assert_eq!(catalog.iter().filter(|p| p.category == category).count(), 6);
        }
    }

    #[test]
    fn test_prices() {
        let catalog = catalog();
        assert_eq!(catalog.first().unwrap().price.to_string(), "29.99");
        assert_eq!(catalog.last().unwrap().price.to_string(), "7.00");
    }

    #[test]
    fn test_placeholder_image() {
        assert_eq!(
            placeholder_image("Couple's Ring"),
            "https://placehold.co/300x400?text=Couples+Ring"
        );
        assert_eq!(
            placeholder_image("Water Based Lube"),
            "https://placehold.co/300x400?text=Water+Based+Lube"
        );
    }
}
