use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use tracing::{error, info};

/// Schema of the SQL-backed target document store.
pub struct TargetMigrator;

#[async_trait::async_trait]
impl MigratorTrait for TargetMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_documents_table::Migration),
            Box::new(m20240601_000002_create_counters_table::Migration),
            Box::new(m20240601_000003_create_migration_status_table::Migration),
        ]
    }
}

/// Applies pending target-store migrations.
pub async fn install_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Installing target store schema");
    let result = TargetMigrator::up(db, None).await;
    match &result {
        Ok(_) => info!("Target store schema is up to date"),
        Err(e) => error!("Target store schema installation failed: {}", e),
    }
    result
}

mod m20240601_000001_create_documents_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_documents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Documents::Collection).string_len(64).not_null())
                        .col(ColumnDef::new(Documents::DocKey).big_integer().not_null())
                        .col(ColumnDef::new(Documents::Body).json().not_null())
                        .primary_key(
                            Index::create()
                                .col(Documents::Collection)
                                .col(Documents::DocKey),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Documents {
        Table,
        Collection,
        DocKey,
        Body,
    }
}

mod m20240601_000002_create_counters_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Counters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Counters::Name)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Counters::SequenceValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Counters::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Counters {
        Table,
        Name,
        SequenceValue,
    }
}

mod m20240601_000003_create_migration_status_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_migration_status_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MigrationStatus::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MigrationStatus::Name)
                                .string_len(64)
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MigrationStatus::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(MigrationStatus::FirstRun)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MigrationStatus::LastRun)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(MigrationStatus::DurationSeconds).double().null())
                        .col(
                            ColumnDef::new(MigrationStatus::Processed)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MigrationStatus::Succeeded)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MigrationStatus::Failed)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(MigrationStatus::Error).text().null())
                        .col(ColumnDef::new(MigrationStatus::Stack).text().null())
                        .col(ColumnDef::new(MigrationStatus::Details).json().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MigrationStatus::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum MigrationStatus {
        Table,
        Name,
        Status,
        FirstRun,
        LastRun,
        DurationSeconds,
        Processed,
        Succeeded,
        Failed,
        Error,
        Stack,
        Details,
    }
}
