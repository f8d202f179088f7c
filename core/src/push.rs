use gallery_registry_client::RegistryClient;

use crate::package::Package;

pub type LocalFuture<'a, T = ()> =
    std::pin::Pin<Box<dyn Future<Output = crate::Result<T>> + Send + 'a>>;

/// Write side of the gallery as seen by the push cache.
pub trait PackagePusher: Send + Sync {
    fn push<'d>(
        &'d self,
        package: &'d Package,
    ) -> LocalFuture<'d>;

    fn unlist<'d>(
        &'d self,
        id: &'d str,
        version: &'d str,
    ) -> LocalFuture<'d>;
}

impl PackagePusher for RegistryClient {
    fn push<'d>(
        &'d self,
        package: &'d Package,
    ) -> LocalFuture<'d> {
        Box::pin(async move {
            RegistryClient::push(self, &package.file_name(), package.content.clone()).await?;
            Ok(())
        })
    }

    fn unlist<'d>(
        &'d self,
        id: &'d str,
        version: &'d str,
    ) -> LocalFuture<'d> {
        Box::pin(async move {
            RegistryClient::unlist(self, id, version).await?;
            Ok(())
        })
    }
}
