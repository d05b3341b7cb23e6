#[actix_web::main]
async fn main() -> std::io::Result<()> {
    certificados_server::run().await
}
