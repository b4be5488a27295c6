//! STM32F0-specific HAL for the Periscope firmware
//!
//! This crate implements the `periscope-core` hardware traits on STM32F0
//! parts with embassy-stm32 register access. Supported chips:
//!
//! - STM32F072RB (12-bit ADC with 18 channels, DMA1, TIM15)
//!
//! # Features
//!
//! - `stm32f072rb` - Enable support for STM32F072RBT6
//! - `defmt` - Enable debug formatting support

#![no_std]

pub mod adc;
pub mod uart;

pub use adc::{IrqEvents, StmAdc};
pub use uart::{UartBusError, UartConfig};
