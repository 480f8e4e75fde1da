pub async fn hello() -> &'static str {
    "Wedding planner API"
}
