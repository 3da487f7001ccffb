//! Outbound `nfeStatusServicoNF` SOAP envelope.

/// Layout version sent in `versaoDados`.
pub const PROTOCOL_VERSION: &str = "4.00";

pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Value of the `SOAPAction` header.
pub const SOAP_ACTION: &str = "nfeStatusServicoNF";

/// Build the status request body for a region's numeric identifier.
pub fn build(numeric_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <nfeStatusServicoNF xmlns="http://www.portalfiscal.inf.br/nfe">
      <nFeCabecMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NfeStatusServico2">
        <cUF>{numeric_id}</cUF>
        <versaoDados>{PROTOCOL_VERSION}</versaoDados>
      </nFeCabecMsg>
    </nfeStatusServicoNF>
  </soap:Body>
</soap:Envelope>"#
    )
}
