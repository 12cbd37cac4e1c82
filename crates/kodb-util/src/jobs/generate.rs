//! Scripts generated from templates and the model catalog.
//!
//! Each script is named after the `ManualSetup` artifact it corresponds to,
//! so the same value can be executed or written out.

use crate::artifacts::{ArtifactStep, Layout, Template, TemplateVars};
use crate::config::GenDbConfig;
use crate::error::Result;
use crate::models::ModelCatalog;
use crate::script::Script;

pub fn database_scripts(layout: &Layout, db: &GenDbConfig) -> Result<Vec<Script>> {
    let sql = layout.render(Template::CreateDatabase, &TemplateVars::database(&db.name))?;
    Ok(vec![Script::batch(
        ArtifactStep::CreateDatabase.file_name(&db.name),
        sql,
    )])
}

/// One script per schema. The artifact name carries the database since a
/// schema name may repeat across databases.
pub fn schema_scripts(layout: &Layout, db: &GenDbConfig) -> Result<Vec<Script>> {
    db.schemas
        .iter()
        .map(|schema| {
            let vars = TemplateVars::database(&db.name).with_schema(schema);
            let sql = layout.render(Template::CreateSchema, &vars)?;
            let name = format!("{}_{}", db.name, schema);
            Ok(Script::batch(ArtifactStep::CreateSchema.file_name(&name), sql))
        })
        .collect()
}

pub fn user_scripts(layout: &Layout, db: &GenDbConfig) -> Result<Vec<Script>> {
    db.users
        .iter()
        .map(|user| {
            let vars = TemplateVars::database(&db.name)
                .with_user(&user.name)
                .with_schema(&user.schema);
            let sql = layout.render(Template::CreateUser, &vars)?;
            Ok(Script::batch(ArtifactStep::CreateUser.file_name(&user.name), sql))
        })
        .collect()
}

pub fn login_scripts(layout: &Layout, db: &GenDbConfig) -> Result<Vec<Script>> {
    db.logins
        .iter()
        .map(|login| {
            let vars = TemplateVars::database(&db.name).with_login(&login.name, &login.pass);
            let sql = layout.render(Template::CreateLogin, &vars)?;
            Ok(Script::batch(ArtifactStep::CreateLogin.file_name(&login.name), sql))
        })
        .collect()
}

pub fn table_scripts(models: &dyn ModelCatalog, db: &GenDbConfig) -> Result<Vec<Script>> {
    Ok(models
        .tables(&db.name)?
        .into_iter()
        .map(|table| {
            Script::batch(
                ArtifactStep::CreateTable.file_name(&table.name),
                table.create_sql,
            )
        })
        .collect())
}

/// Everything a structure export writes, in step order.
pub fn structure_scripts(
    layout: &Layout,
    models: &dyn ModelCatalog,
    db: &GenDbConfig,
) -> Result<Vec<Script>> {
    let mut scripts = database_scripts(layout, db)?;
    scripts.extend(schema_scripts(layout, db)?);
    scripts.extend(user_scripts(layout, db)?);
    scripts.extend(login_scripts(layout, db)?);
    scripts.extend(table_scripts(models, db)?);
    Ok(scripts)
}
