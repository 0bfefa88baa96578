//! Service request service

use std::sync::Arc;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{ServiceKind, ServiceRequest, SessionToken};

pub struct ServiceRequestService {
    repository: Arc<DuckDbRepository>,
}

impl ServiceRequestService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn request(&self, token: &SessionToken, kind: ServiceKind) -> Result<ServiceRequest> {
        let request = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            let request = ServiceRequest::new(&account.username, kind);
            uow.append_service_request(&request)?;
            Ok(request)
        })?;

        tracing::info!(request_id = %request.id, kind = kind.as_str(), "service requested");
        Ok(request)
    }

    /// The account's requests, oldest first
    pub fn list(&self, token: &SessionToken) -> Result<Vec<ServiceRequest>> {
        self.repository.read(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            uow.service_requests(&account.username)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountType};
    use chrono::{SubsecRound, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_request_and_list() {
        let repo = Arc::new(DuckDbRepository::in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let now = Utc::now().trunc_subsecs(6);
        let account = Account {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            username: "alice".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            account_type: AccountType::Business,
            balance: Decimal::ZERO,
            session_token: SessionToken::generate(),
            created_at: now,
            updated_at: now,
        };
        repo.unit_of_work(|uow| uow.insert_account(&account)).unwrap();

        let service = ServiceRequestService::new(repo);
        let token = &account.session_token;
        service.request(token, ServiceKind::Card).unwrap();
        service.request(token, ServiceKind::Checkbook).unwrap();

        let kinds: Vec<_> = service.list(token).unwrap().into_iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ServiceKind::Card, ServiceKind::Checkbook]);

        assert!(matches!(
            service.request(&SessionToken::generate(), ServiceKind::Card),
            Err(Error::InvalidSession)
        ));
    }
}
