// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Audio and control UDP socket setup for one Echolink instance (§4.4,
//! §5). Each instance owns one bound socket per role; packet parsing and
//! session state live elsewhere ([`crate::rtp`], [`crate::rtcp`],
//! [`crate::session`]) so only the bind/reuse-address plumbing is here.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

/// Bind a UDP socket for one Echolink instance's audio or control role,
/// with `SO_REUSEADDR` set so a restart doesn't have to wait out
/// `TIME_WAIT` on the previous process's socket.
pub fn bind_reuseaddr(bind_addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&bind_addr.into())?;
    Ok(socket.into())
}

/// Bind the pair of sockets one Echolink instance needs: audio (RTP) on
/// `base_port`, control (RTCP) on `base_port + 1`, per §4.4's "audio
/// socket" / "control socket" split.
pub fn bind_instance(ipaddr: std::net::Ipv4Addr, base_port: u16) -> io::Result<(UdpSocket, UdpSocket)> {
    let audio = bind_reuseaddr(SocketAddr::new(ipaddr.into(), base_port))?;
    let control = bind_reuseaddr(SocketAddr::new(ipaddr.into(), base_port + 1))?;
    Ok((audio, control))
}
