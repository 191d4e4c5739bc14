use std::collections::HashSet;

use bson::oid::ObjectId;
use mongodb::{options::IndexOptions, IndexModel};
use serde::{Deserialize, Serialize};

use crate::{error::Error, mongo_ext::Collection, store::MongoStore};

#[derive(Serialize, Deserialize, Debug)]
pub struct MigrateModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub version: i64,
}

#[derive(Clone)]
pub struct MigrationCollection(pub Collection<MigrateModel>);

impl std::ops::Deref for MigrationCollection {
    type Target = Collection<MigrateModel>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MigrationCollection {
    pub async fn insert_version(&self, version: i64) -> Result<(), Error> {
        self.insert_one(
            MigrateModel {
                id: ObjectId::new(),
                version,
            },
            None,
        )
        .await
        .map(|_| ())
        .map_err(Into::into)
    }
}

fn index(keys: bson::Document, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(unique).build())
        .build()
}

impl MongoStore {
    fn migrations(&self) -> MigrationCollection {
        MigrationCollection(self.database.collection("migrations").into())
    }

    async fn v1_migrate(&self) -> Result<(), Error> {
        self.migrations()
            .create_index(index(bson::doc! { "version": 1 }, true), None)
            .await?;

        self.users
            .create_index(index(bson::doc! { "email": 1 }, true), None)
            .await?;

        self.categories
            .create_index(index(bson::doc! { "slug": 1 }, false), None)
            .await?;

        self.products
            .create_index(index(bson::doc! { "slug": 1 }, false), None)
            .await?;
        self.products
            .create_index(index(bson::doc! { "category": 1 }, false), None)
            .await?;

        self.orders
            .create_index(index(bson::doc! { "buyer": 1 }, false), None)
            .await?;

        Ok(())
    }

    /// Applies every migration not yet recorded in the `migrations` collection.
    /// Index creation is idempotent, so a crash between a step and its record
    /// only means the step reruns on the next start.
    pub async fn run_migration(&self) -> Result<(), Error> {
        let migrations = self.migrations();

        let applied: HashSet<i64> = migrations
            .find_all(None, None)
            .await?
            .into_iter()
            .map(|it| it.version)
            .collect();

        macro_rules! migrate {
            ($version:expr, $fun:ident) => {
                if !applied.contains(&$version) {
                    tracing::info!("running migration version {}", $version);
                    self.$fun().await?;
                    migrations.insert_version($version).await?;
                }
            };
        }

        migrate!(1, v1_migrate);

        Ok(())
    }
}
