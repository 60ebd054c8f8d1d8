use fitlog_core::store::HOSTED_MIGRATION;

/// Print the SQL a hosted project must run before `fitlog` can use it.
pub(crate) fn cmd_schema(json: bool) {
    if json {
        println!("{}", serde_json::json!({ "sql": HOSTED_MIGRATION }));
    } else {
        print!("{HOSTED_MIGRATION}");
    }
}
