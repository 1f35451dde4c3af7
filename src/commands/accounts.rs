use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::AccountInfo;
use crate::store::AccountStore;
use crate::{Config, Result};

pub async fn list_accounts(config: Config) -> Result<Out<Vec<AccountInfo>>> {
    let accounts = config
        .db()
        .list_accounts()
        .await
        .pub_result(ErrorType::Database)?;
    let mut message = format!("Found: {}", plural(accounts.len(), "account", "accounts"));
    for a in &accounts {
        message.push_str(&format!(
            "\n{}  {}  {} ({}, {})",
            a.bank_name, a.account_number, a.contact_name, a.phone_number, a.document_id
        ));
    }
    Ok(Out::new(message, accounts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_list_accounts() {
        let env = TestEnv::new().await;
        let out = list_accounts(env.config()).await.unwrap();
        assert_eq!(out.message(), "Found: 0 accounts");

        let account = AccountInfo {
            document_id: "d1".to_string(),
            user_id: "test-user".to_string(),
            bank_name: "Nequi".to_string(),
            ..AccountInfo::default()
        };
        env.config().db().upsert_account(&account).await.unwrap();
        let out = list_accounts(env.config()).await.unwrap();
        assert_eq!(out.structure().unwrap(), &vec![account]);
        assert!(out.message().contains("Nequi"));
    }
}
