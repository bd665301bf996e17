use async_trait::async_trait;

use crate::company::{Company, CompanyKey};

/// Tenant directory.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find(
        &self,
        key: &CompanyKey,
    ) -> Result<Option<Company>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fixed set of tenants held in memory. Used by tests and single-tenant deployments.
#[derive(Default)]
pub struct InMemoryCompanyRepository {
    companies: Vec<Company>,
}

impl InMemoryCompanyRepository {
    pub fn new(companies: Vec<Company>) -> Self {
        Self { companies }
    }
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find(
        &self,
        key: &CompanyKey,
    ) -> Result<Option<Company>, Box<dyn std::error::Error + Send + Sync>> {
        let found = self.companies.iter().find(|c| match key {
            CompanyKey::Id(id) => c.id == *id,
            CompanyKey::Slug(slug) => c.slug.as_deref() == Some(slug.as_str()),
        });
        Ok(found.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::fixtures::company;

    #[tokio::test]
    async fn test_lookup_by_id_and_slug() {
        let repo = InMemoryCompanyRepository::new(vec![company(Some("k"))]);

        assert!(repo.find(&CompanyKey::Id(7)).await.unwrap().is_some());
        assert!(repo.find(&CompanyKey::Slug("la-tasca".into())).await.unwrap().is_some());
        assert!(repo.find(&CompanyKey::Id(8)).await.unwrap().is_none());
    }
}
