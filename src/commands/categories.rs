//! Category command handlers.

use crate::args::{AddCategoryArgs, DeleteCategoriesArgs, UpdateCategoryArgs};
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Category, CategoryId, Color};
use crate::store::CategoryStore;
use crate::{Config, Result};
use anyhow::anyhow;
use std::str::FromStr;

const DEFAULT_COLOR: Color = Color::argb(0xFF9E9E9E);

fn category_line(c: &Category) -> String {
    format!("{}  {}  {}", c.id(), c.color(), c.name())
}

fn parse_color(color: &str) -> Result<Color> {
    Color::from_str(color).pub_result(ErrorType::Request)
}

pub async fn list_categories(config: Config) -> Result<Out<Vec<Category>>> {
    let categories = config
        .db()
        .list_categories()
        .await
        .pub_result(ErrorType::Database)?;
    let mut message = format!(
        "Found: {}",
        plural(categories.len(), "category", "categories")
    );
    for c in &categories {
        message.push('\n');
        message.push_str(&category_line(c));
    }
    Ok(Out::new(message, categories))
}

/// Creates a category with a new random id. Names are not required to be unique.
pub async fn add_category(config: Config, args: &AddCategoryArgs) -> Result<Out<Category>> {
    let color = match args.color() {
        Some(color) => parse_color(color)?,
        None => DEFAULT_COLOR,
    };
    let mut category = Category::new(args.name(), color);
    category.set_user_id(config.user_id().map(str::to_string));
    config
        .db()
        .upsert_category(&category)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Added category {}", category_line(&category)),
        category,
    ))
}

/// Changes the name and/or color of an existing category.
///
/// # Errors
/// - A `request` error if no category has the given id.
pub async fn update_category(config: Config, args: &UpdateCategoryArgs) -> Result<Out<Category>> {
    let db = config.db();
    let id = CategoryId::from_stored(args.id());
    let color = args.color().map(parse_color).transpose()?;
    let mut category = match db.get_category(&id).await.pub_result(ErrorType::Database)? {
        Some(category) => category,
        None => return Err(anyhow!("Category {id} not found")).pub_result(ErrorType::Request),
    };

    if let Some(name) = args.name() {
        category.set_name(name);
    }
    if let Some(color) = color {
        category.set_color(color);
    }
    db.upsert_category(&category)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Updated category {}", category_line(&category)),
        category,
    ))
}

/// Deletes categories by id. Transactions that were assigned one of them keep the id.
pub async fn delete_categories(
    config: Config,
    args: &DeleteCategoriesArgs,
) -> Result<Out<Vec<String>>> {
    let db = config.db();
    let mut deleted = Vec::new();
    for id in args.ids() {
        let id = CategoryId::from_stored(id.as_str());
        if db
            .delete_category_by_id(&id)
            .await
            .pub_result(ErrorType::Database)?
        {
            deleted.push(id.to_string());
        }
    }
    let message = format!(
        "Deleted {}",
        plural(deleted.len(), "category", "categories")
    );
    Ok(Out::new(message, deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_CATEGORIES;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_list_categories() {
        let env = TestEnv::new().await;
        let out = list_categories(env.config()).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), DEFAULT_CATEGORIES.len());
        assert!(out.message().contains("Food & Dining"));
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let env = TestEnv::new().await;
        let out = add_category(
            env.config(),
            &AddCategoryArgs::new("Gifts", Some("#FF0000".to_string())),
        )
        .await
        .unwrap();
        let added = out.structure().unwrap().clone();
        assert_eq!(added.color(), Color::argb(0xFFFF0000));
        assert_eq!(added.user_id(), Some("test-user"));

        let out = update_category(
            env.config(),
            &UpdateCategoryArgs::new(added.id().as_str(), Some("Presents".to_string()), None),
        )
        .await
        .unwrap();
        let updated = out.structure().unwrap();
        assert_eq!(updated.name(), "Presents");
        assert_eq!(updated.color(), added.color());

        let out = delete_categories(
            env.config(),
            &DeleteCategoriesArgs::new([added.id().as_str(), "missing"]),
        )
        .await
        .unwrap();
        assert_eq!(out.message(), "Deleted 1 category");
    }

    #[tokio::test]
    async fn test_bad_color_is_a_request_error() {
        let env = TestEnv::new().await;
        let err = add_category(
            env.config(),
            &AddCategoryArgs::new("Gifts", Some("red".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "request error");
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let env = TestEnv::new().await;
        let err = update_category(
            env.config(),
            &UpdateCategoryArgs::new("missing", Some("x".to_string()), None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "request error");
    }
}
