//! Schema history of the software catalog.
//!
//! Records are appended, never edited. Each identifier is the authoring
//! time in milliseconds followed by a short description.

use crate::backend::ColumnChanges;
use crate::column::{Column, ColumnType, ReferentialAction};
use crate::migration::{Migration, MigrationError, MigrationRegistry};
use crate::operation::{
    AddColumn, AlterColumn, CreateEnum, CreateIndex, CreateTable, DropColumn, DropEnum, DropIndex,
    DropTable, Index, Operation, RenameTable, RunSql,
};

pub const EXTERNAL_DATA_ORIGIN_TYPE: &str = "external_data_origin_type";

const EXTERNAL_DATA_ORIGINS: [&str; 4] = ["wikidata", "HAL", "ComptoirDuLibre", "GitHub"];

fn external_data_origin() -> ColumnType {
    ColumnType::enumeration(EXTERNAL_DATA_ORIGIN_TYPE, EXTERNAL_DATA_ORIGINS)
}

fn id() -> Column {
    Column::new("id", ColumnType::Serial).primary_key()
}

/// Key and indexed text columns are bounded so MySQL can index them.
fn key_text(name: &str) -> Column {
    Column::new(name, ColumnType::VarChar(255))
}

fn foreign_id(name: &str, table: &str) -> Column {
    Column::new(name, ColumnType::Integer)
        .not_null()
        .references(table, "id")
        .on_delete(ReferentialAction::Cascade)
}

/// All catalog records, ready to hand to a `Migrator`.
pub fn registry() -> Result<MigrationRegistry, MigrationError> {
    let mut registry = MigrationRegistry::new();
    for migration in migrations() {
        registry.register(migration)?;
    }
    Ok(registry)
}

fn migrations() -> Vec<Migration> {
    vec![
        create_initial_tables(),
        index_external_id(),
        add_last_extra_data_fetch_at(),
        rename_agents_to_users(),
        add_sub_to_users(),
        version_nullable("1718721009582_software_users_version_nullable"),
        version_nullable("1718784155307_software_users_version_optional"),
        create_sources(),
    ]
}

/// The explicit reverse drops whole tables so it does not depend on the
/// `agents_email_unique` index still existing.
fn create_initial_tables() -> Migration {
    let down: Vec<Box<dyn Operation>> = vec![
        Box::new(DropTable::new("software_external_datas")),
        Box::new(DropTable::new("instances")),
        Box::new(DropTable::new("software_referents")),
        Box::new(DropTable::new("software_users")),
        Box::new(DropTable::new("softwares")),
        Box::new(DropTable::new("agents")),
        Box::new(DropEnum::new(EXTERNAL_DATA_ORIGIN_TYPE)),
    ];

    Migration::new("1716372428102_create_initial_tables")
        .operation(CreateEnum::new(
            EXTERNAL_DATA_ORIGIN_TYPE,
            EXTERNAL_DATA_ORIGINS,
        ))
        .operation(
            CreateTable::new("agents")
                .add_column(id())
                .add_column(key_text("email").not_null())
                .add_column(Column::new("organization", ColumnType::Text))
                .add_column(Column::new("about", ColumnType::Text))
                .add_column(
                    Column::new("isPublic", ColumnType::Boolean)
                        .not_null()
                        .default("false"),
                ),
        )
        .operation(CreateIndex::new(
            "agents",
            Index::new("agents_email_unique").column("email").unique(),
        ))
        .operation(
            CreateTable::new("softwares")
                .add_column(id())
                .add_column(Column::new("name", ColumnType::Text).not_null())
                .add_column(Column::new("description", ColumnType::Text).not_null())
                .add_column(Column::new("license", ColumnType::Text).not_null())
                .add_column(Column::new("referencedSinceTime", ColumnType::BigInt).not_null())
                .add_column(Column::new("updateTime", ColumnType::BigInt).not_null())
                .add_column(Column::new("dereferencing", ColumnType::JsonB))
                .add_column(Column::new("isStillInUse", ColumnType::Boolean).not_null())
                .add_column(Column::new("logoUrl", ColumnType::Text))
                .add_column(Column::new("softwareType", ColumnType::JsonB).not_null())
                .add_column(key_text("externalId"))
                .add_column(Column::new("externalDataOrigin", external_data_origin()))
                .add_column(Column::new("keywords", ColumnType::JsonB).not_null())
                .add_column(
                    Column::new("addedByAgentId", ColumnType::Integer)
                        .references("agents", "id")
                        .on_delete(ReferentialAction::SetNull),
                ),
        )
        .operation(
            CreateTable::new("software_users")
                .add_column(foreign_id("softwareId", "softwares"))
                .add_column(foreign_id("agentId", "agents"))
                .add_column(Column::new("useCaseDescription", ColumnType::Text).not_null())
                .add_column(Column::new("os", ColumnType::Text))
                .add_column(Column::new("version", ColumnType::Text).not_null())
                .add_column(Column::new("serviceUrl", ColumnType::Text)),
        )
        .operation(
            CreateTable::new("software_referents")
                .add_column(foreign_id("softwareId", "softwares"))
                .add_column(foreign_id("agentId", "agents"))
                .add_column(Column::new("isExpert", ColumnType::Boolean).not_null())
                .add_column(Column::new("useCaseDescription", ColumnType::Text).not_null())
                .add_column(Column::new("serviceUrl", ColumnType::Text)),
        )
        .operation(
            CreateTable::new("instances")
                .add_column(id())
                .add_column(foreign_id("mainSoftwareSillId", "softwares"))
                .add_column(Column::new("organization", ColumnType::Text).not_null())
                .add_column(Column::new("targetAudience", ColumnType::Text).not_null())
                .add_column(Column::new("publicUrl", ColumnType::Text))
                .add_column(foreign_id("addedByAgentId", "agents"))
                .add_column(Column::new("referencedSinceTime", ColumnType::BigInt).not_null())
                .add_column(Column::new("updateTime", ColumnType::BigInt).not_null()),
        )
        .operation(
            CreateTable::new("software_external_datas")
                .add_column(key_text("externalId").primary_key())
                .add_column(Column::new("externalDataOrigin", external_data_origin()).not_null())
                .add_column(Column::new("developers", ColumnType::JsonB).not_null())
                .add_column(Column::new("label", ColumnType::JsonB).not_null())
                .add_column(Column::new("description", ColumnType::JsonB).not_null())
                .add_column(Column::new("isLibreSoftware", ColumnType::Boolean))
                .add_column(Column::new("logoUrl", ColumnType::Text))
                .add_column(Column::new("framaLibreId", ColumnType::Text))
                .add_column(Column::new("websiteUrl", ColumnType::Text))
                .add_column(Column::new("sourceUrl", ColumnType::Text))
                .add_column(Column::new("documentationUrl", ColumnType::Text))
                .add_column(Column::new("license", ColumnType::Text))
                .add_column(Column::new("softwareVersion", ColumnType::Text))
                .add_column(Column::new("publicationTime", ColumnType::TimestampTz)),
        )
        .down(down)
}

fn index_external_id() -> Migration {
    Migration::new("1716382009467_index_software_external_id").operation(CreateIndex::new(
        "softwares",
        Index::new("softwares_external_id_idx").column("externalId"),
    ))
}

fn add_last_extra_data_fetch_at() -> Migration {
    Migration::new("1717162141365_add_last_extra_data_fetch_at").operation(AddColumn::new(
        "softwares",
        Column::new("lastExtraDataFetchAt", ColumnType::TimestampTz),
    ))
}

/// Restates the column type so dialects that redefine the whole column on
/// ALTER can render it.
fn version_nullable(identifier: &'static str) -> Migration {
    Migration::new(identifier).operation(
        AlterColumn::new("software_users", "version")
            .set_type(ColumnType::Text)
            .set_nullable(true)
            .with_reverse(
                ColumnChanges::new()
                    .set_type(ColumnType::Text)
                    .set_nullable(false),
            ),
    )
}

fn rename_agents_to_users() -> Migration {
    Migration::new("1718110001924_rename_agents_to_users")
        .operation(RenameTable::new("agents", "users"))
}

/// Accounts move to OIDC subjects; email stops being the unique key. The
/// reverse deliberately leaves the unique index dropped.
fn add_sub_to_users() -> Migration {
    let down: Vec<Box<dyn Operation>> = vec![Box::new(DropColumn::new("users", "sub"))];

    Migration::new("1718286421066_add_sub_to_users")
        .operation(AddColumn::new("users", Column::new("sub", ColumnType::Text)))
        .operation(DropIndex::new("users", "agents_email_unique"))
        .down(down)
}

fn create_sources() -> Migration {
    Migration::new("1719587603274_create_sources")
        .operation(
            CreateTable::new("sources")
                .add_column(key_text("slug").primary_key())
                .add_column(Column::new("kind", external_data_origin()).not_null())
                .add_column(Column::new("url", ColumnType::Text).not_null())
                .add_column(Column::new("priority", ColumnType::Integer).not_null())
                .add_column(Column::new("description", ColumnType::JsonB)),
        )
        .operation(
            RunSql::reversible(
                "INSERT INTO sources (slug, kind, url, priority) \
                 VALUES ('wikidata', 'wikidata', 'https://www.wikidata.org', 1)",
                "DELETE FROM sources WHERE slug = 'wikidata'",
            )
            .with_description("Seed the default wikidata source"),
        )
}
