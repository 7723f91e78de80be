//! Order confirmation email over SMTP. Dispatch is fire-and-forget: the
//! calling transition is persisted and acknowledged whether or not the relay
//! accepts the message.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::models::{OrderEntity, OrderItemEntity};

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    store_name: String,
    public_base_url: String,
}

impl Mailer {
    /// Build the SMTP transport from config. Returns `None` when SMTP is not
    /// configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(host) = &config.smtp_host else {
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .context("Invalid SMTP relay host")?;
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .smtp_from
            .clone()
            .or_else(|| config.smtp_user.clone())
            .context("SMTP_FROM or SMTP_USER must be set when SMTP_HOST is")?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
            store_name: config.store_name.clone(),
            public_base_url: config.public_base_url.clone(),
        }))
    }

    pub async fn send_order_confirmation(
        &self,
        order: &OrderEntity,
        items: &[OrderItemEntity],
    ) -> Result<()> {
        let Some(to) = &order.delivery_email else {
            return Ok(());
        };

        let items_list: String = items
            .iter()
            .map(|item| {
                format!(
                    "<li>{}x {} - ₹{:.2}</li>",
                    item.quantity, item.item_name, item.line_subtotal
                )
            })
            .collect();

        let html = format!(
            "<h1>Order Confirmed!</h1>\
             <p>Hi {name}, we've received your order and we're preparing it right now.</p>\
             <h2>Order #{number}</h2>\
             <ul>{items_list}</ul>\
             <p><b>Total paid:</b> ₹{total:.2}</p>\
             <p><b>Delivery address:</b><br/>{address}</p>\
             <p><a href=\"{base}/orders/{id}\">Track your order</a></p>",
            name = order.delivery_name,
            number = order.order_number,
            total = order.total,
            address = delivery_address(order),
            base = self.public_base_url,
            id = order.id,
        );

        let message = Message::builder()
            .from(
                format!("\"{}\" <{}>", self.store_name, self.from)
                    .parse()
                    .context("Invalid sender address")?,
            )
            .to(to.parse().context("Invalid recipient address")?)
            .subject(format!(
                "Order Confirmed! #{} is on its way",
                order.order_number
            ))
            .header(ContentType::TEXT_HTML)
            .body(html)
            .context("Failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP relay rejected the message")?;
        tracing::info!(to = %to, order = %order.order_number, "Confirmation email sent");
        Ok(())
    }
}

fn delivery_address(order: &OrderEntity) -> String {
    let mut parts = vec![order.address_line1.clone()];
    if let Some(line2) = &order.address_line2 {
        parts.push(line2.clone());
    }
    parts.push(format!("{} - {}", order.city, order.pincode));
    parts.join(", ")
}

/// Spawn the confirmation email off the request path. Failures are logged,
/// never propagated.
pub fn spawn_order_confirmation(
    mailer: Option<Mailer>,
    order: OrderEntity,
    items: Vec<OrderItemEntity>,
) {
    let Some(mailer) = mailer else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = mailer.send_order_confirmation(&order, &items).await {
            tracing::error!(order = %order.order_number, "Failed to send confirmation email: {err:#}");
        }
    });
}
