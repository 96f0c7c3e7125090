// SPDX-License-Identifier: MIT

fn main() {
    dicomweb_multipart::run();
}
